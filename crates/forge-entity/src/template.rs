//! Product template, schema and identity tokens

use rand::Rng;
use serde_json::json;
use ulid::Ulid;

use crate::entity::{fields, Entity, EntityStatus};
use crate::error::EntityResult;
use crate::schema::{EntitySchema, FieldShape};
use crate::sections::default_sections;
use crate::value::Attr;

/// Id prefix for products
pub const PRODUCT_ID_PREFIX: &str = "p";

const TOKEN_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Fresh unique id of the form `<prefix>-<ulid>`
#[must_use]
pub fn new_entity_id(prefix: &str) -> String {
    format!("{prefix}-{}", Ulid::new().to_string().to_lowercase())
}

/// Random upper-case base-36 token of `len` characters
#[must_use]
pub fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(TOKEN_ALPHABET[rng.random_range(0..TOKEN_ALPHABET.len())]))
        .collect()
}

/// Blank product ready for the build steps
///
/// Carries a fresh id and SKU, draft status, empty lists for every
/// collection-valued field and the default section layout.
///
/// # Errors
/// Only if the generated id were empty, which cannot happen
pub fn product_template() -> EntityResult<Entity> {
    let base = Entity::from_json(json!({
        "id": new_entity_id(PRODUCT_ID_PREFIX),
        "sku": format!("SKU-{}", random_token(6)),
        "name": "",
        "subtitle": "",
        "slug": "",
        "intro": "",
        "description": "",
        "longDescription": "",
        "type": "Software",
        "visibility": "public",
        "status": EntityStatus::Draft.as_str(),
        "price": 0,
        "originalPrice": 0,
        "currency": "INR",
        "image": "",
        "gallery": [],
        "tags": [],
        "keywords": [],
        "techStack": [],
        "workflow": [],
        "systemModules": [],
        "docs": [],
        "faqs": [],
        "features_list": [],
        "objectives": { "technical": [], "business": [], "learning": [] },
        "scope": { "industry": [], "academic": [], "future": "" },
        "enableReviews": true,
        "moderationMode": "Auto",
        "enableAddToCart": true,
        "enableProcureNow": true,
        "enableWishlist": true,
        "enableShare": true,
        "purchaseLimit": 1,
        "accessType": "Instant",
        "seo": {
            "metaTitle": "",
            "metaDescription": "",
            "canonicalUrl": "",
            "indexingRules": "index, follow",
            "ogTags": {}
        },
        "architectureSummary": "",
        "relatedProductIds": [],
        "aiRecommendationEnabled": true
    }))?;
    Ok(base.with(fields::SECTIONS, Attr::Map(default_sections())))
}

fn texts() -> FieldShape {
    FieldShape::list(FieldShape::Text)
}

/// Declared shape of a product record
#[must_use]
pub fn product_schema() -> EntitySchema {
    use FieldShape::{Any, Bool, Number, Text};

    let text_fields = [
        "sku", "name", "subtitle", "slug", "intro", "description", "longDescription", "type",
        "visibility", "status", "language", "version", "lastUpdated", "owner", "supportContact",
        "category", "subcategory", "industryCategory", "domainCategory", "academicCategory",
        "image", "videoUrl", "demoUrl", "coverImage", "bannerImage", "couponCode", "offerText",
        "dealExpiry", "taxRule", "currency", "refundPolicy", "accessType", "license",
        "architectureSummary", "moderationMode", "createdAt", "updatedAt",
    ];
    let number_fields = [
        "price", "originalPrice", "discountPercentage", "purchaseLimit", "downloads", "rating",
        "reviewCount",
    ];
    let bool_fields = [
        "autoSlider", "isStudentOffer", "isLimitedDeal", "emiAvailable", "enableAddToCart",
        "enableProcureNow", "enableWishlist", "enableShare", "enableReviews",
        "aiRecommendationEnabled", "isFeatured", "isBestSeller",
    ];
    let text_list_fields = [
        "tags", "keywords", "gallery", "fileFormats", "compatibility", "highlights",
        "features_list", "relatedProductIds",
    ];

    let schema = text_fields
        .iter()
        .fold(EntitySchema::new("product"), |s, name| s.field(name, Text));
    let schema = number_fields.iter().fold(schema, |s, name| s.field(name, Number));
    let schema = bool_fields.iter().fold(schema, |s, name| s.field(name, Bool));
    let schema = text_list_fields.iter().fold(schema, |s, name| s.field(name, texts()));

    schema
        .field(
            "objectives",
            FieldShape::record([
                ("technical", texts()),
                ("business", texts()),
                ("learning", texts()),
            ]),
        )
        .field(
            "scope",
            FieldShape::record([("industry", texts()), ("academic", texts()), ("future", Text)]),
        )
        .field(
            "techStack",
            FieldShape::list(FieldShape::record([
                ("name", Text),
                ("layer", Text),
                ("reason", Text),
            ])),
        )
        .field(
            "workflow",
            FieldShape::list(FieldShape::record([("step", Text), ("desc", Text)])),
        )
        .field(
            "systemModules",
            FieldShape::list(FieldShape::record([
                ("name", Text),
                ("description", Text),
                ("features", texts()),
            ])),
        )
        .field(
            "docs",
            FieldShape::list(FieldShape::record([
                ("label", Text),
                ("type", Text),
                ("isIncluded", Bool),
                ("version", Text),
            ])),
        )
        .field(
            "faqs",
            FieldShape::list(FieldShape::record([("question", Text), ("answer", Text)])),
        )
        .field("reviews", FieldShape::list(Any))
        .field(
            fields::SECTIONS,
            FieldShape::dict(FieldShape::record([
                ("isEnabled", Bool),
                ("order", Number),
                ("priority", Number),
                ("isOptional", Bool),
            ])),
        )
        .field(
            "seo",
            FieldShape::record([
                ("metaTitle", Text),
                ("metaDescription", Text),
                ("canonicalUrl", Text),
                ("indexingRules", Text),
                ("ogTags", FieldShape::dict(Text)),
            ]),
        )
}
