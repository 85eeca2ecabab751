use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A row type the listing repository can upsert in bulk.
///
/// `COLUMNS` must match the serialized field names exactly; upsert SQL is built from it and
/// rows are bound as a JSON array keyed by those names.
pub trait ListingRecord: Serialize + Send + Sync {
    const TABLE: &'static str;
    const KEY_COLUMN: &'static str;
    const COLUMNS: &'static [&'static str];

    fn natural_key(&self) -> &str;
}

/// Keep the last occurrence of every natural key, preserving first-seen order.
pub fn dedupe_by_key<T: ListingRecord + Clone>(records: &[T]) -> Vec<T> {
    let mut slot: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut out: Vec<T> = Vec::with_capacity(records.len());
    for record in records {
        match slot.get(record.natural_key()) {
            Some(&i) => out[i] = record.clone(),
            None => {
                slot.insert(record.natural_key(), out.len());
                out.push(record.clone());
            }
        }
    }
    out
}

/// Multi-select RESO fields arrive as arrays, but some feeds send a bare scalar.
fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(items.into_iter().filter_map(scalar_text).collect()),
        Some(other) => scalar_text(other).map(|item| vec![item]),
    })
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Optional scalar that tolerates the source's loose typing: numbers sent as strings,
/// whole numbers sent as floats, scalars where text is expected. A value that still does not
/// fit becomes `None` instead of rejecting the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(coerce))
}

fn coerce<T: DeserializeOwned>(value: Value) -> Option<T> {
    if value.is_null() {
        return None;
    }
    if let Ok(v) = serde_json::from_value::<T>(value.clone()) {
        return Some(v);
    }
    let widened = match &value {
        Value::String(s) => serde_json::from_str::<T>(s.trim()).ok(),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .and_then(|f| serde_json::from_value::<T>(Value::from(f as i64)).ok())
            .or_else(|| serde_json::from_value::<T>(Value::String(n.to_string())).ok()),
        Value::Bool(b) => serde_json::from_value::<T>(Value::String(b.to_string())).ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };
    if widened.is_none() {
        tracing::debug!(value = %value, "dropping mistyped listing field");
    }
    widened
}

pub const PROPERTY_COLUMNS: &[&str] = &[
    "listing_key",
    "list_price",
    "close_price",
    "mls_status",
    "contract_status",
    "standard_status",
    "transaction_type",
    "property_type",
    "property_sub_type",
    "architectural_style",
    "unparsed_address",
    "street_number",
    "street_name",
    "street_suffix",
    "city",
    "state_or_province",
    "postal_code",
    "county_or_parish",
    "city_region",
    "unit_number",
    "kitchens_above_grade",
    "bedrooms_above_grade",
    "bedrooms_below_grade",
    "bathrooms_total_integer",
    "kitchens_below_grade",
    "kitchens_total",
    "den_family_room_yn",
    "public_remarks",
    "possession_details",
    "photos_change_timestamp",
    "media_change_timestamp",
    "modification_timestamp",
    "system_modification_timestamp",
    "original_entry_timestamp",
    "sold_conditional_entry_timestamp",
    "sold_entry_timestamp",
    "suspended_entry_timestamp",
    "terminated_entry_timestamp",
    "close_date",
    "conditional_expiry_date",
    "purchase_contract_date",
    "suspended_date",
    "terminated_date",
    "unavailable_date",
    "expiration_date",
    "cooling",
    "sewer",
    "basement",
    "basement_entrance",
    "exterior_features",
    "interior_features",
    "pool_features",
    "property_features",
    "heat_type",
    "fireplace_yn",
    "living_area_range",
    "waterfront_yn",
    "possession_type",
    "covered_spaces",
    "parking_spaces",
    "parking_total",
    "association_amenities",
    "locker",
    "balcony_type",
    "pets_allowed",
    "association_fee",
    "association_fee_includes",
    "approximate_age",
    "additional_monthly_fee",
    "tax_annual_amount",
    "tax_year",
    "lot_depth",
    "lot_width",
    "lot_size_units",
    "furnished",
    "rent_includes",
];

/// Stored projection of a RESO Property. Fields outside this set are dropped on
/// deserialization; timestamps and dates stay as the source formatted them and are cast by
/// Postgres on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "PascalCase"))]
pub struct Property {
    pub listing_key: String,
    #[serde(default, deserialize_with = "lenient")]
    pub list_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub close_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub mls_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub contract_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub standard_status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub transaction_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub property_sub_type: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub architectural_style: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub unparsed_address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub street_number: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub street_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub street_suffix: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub state_or_province: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub county_or_parish: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub city_region: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub unit_number: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub kitchens_above_grade: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub bedrooms_above_grade: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub bedrooms_below_grade: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub bathrooms_total_integer: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub kitchens_below_grade: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub kitchens_total: Option<i32>,
    #[serde(default, rename(deserialize = "DenFamilyRoomYN"), deserialize_with = "lenient")]
    pub den_family_room_yn: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub public_remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub possession_details: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub photos_change_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub media_change_timestamp: Option<String>,
    pub modification_timestamp: String,
    #[serde(default, deserialize_with = "lenient")]
    pub system_modification_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub original_entry_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sold_conditional_entry_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sold_entry_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub suspended_entry_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub terminated_entry_timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub close_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub conditional_expiry_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub purchase_contract_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub suspended_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub terminated_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub unavailable_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub expiration_date: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub cooling: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_list")]
    pub sewer: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_list")]
    pub basement: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub basement_entrance: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub exterior_features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_list")]
    pub interior_features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_list")]
    pub pool_features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "string_list")]
    pub property_features: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub heat_type: Option<String>,
    #[serde(default, rename(deserialize = "FireplaceYN"), deserialize_with = "lenient")]
    pub fireplace_yn: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub living_area_range: Option<String>,
    #[serde(default, rename(deserialize = "WaterfrontYN"), deserialize_with = "lenient")]
    pub waterfront_yn: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub possession_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub covered_spaces: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub parking_spaces: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub parking_total: Option<f64>,
    #[serde(default, deserialize_with = "string_list")]
    pub association_amenities: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub locker: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub balcony_type: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub pets_allowed: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub association_fee: Option<f64>,
    #[serde(default, deserialize_with = "string_list")]
    pub association_fee_includes: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub approximate_age: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub additional_monthly_fee: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub tax_annual_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub tax_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub lot_depth: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub lot_width: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub lot_size_units: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub furnished: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub rent_includes: Option<Vec<String>>,
}

impl ListingRecord for Property {
    const TABLE: &'static str = "property";
    const KEY_COLUMN: &'static str = "listing_key";
    const COLUMNS: &'static [&'static str] = PROPERTY_COLUMNS;

    fn natural_key(&self) -> &str {
        &self.listing_key
    }
}

pub const MEDIA_COLUMNS: &[&str] = &[
    "media_key",
    "resource_record_key",
    "media_url",
    "media_type",
    "media_category",
    "image_size_description",
    "media_status",
    "media_order",
    "preferred_photo_yn",
    "short_description",
    "modification_timestamp",
    "media_modification_timestamp",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "PascalCase"))]
pub struct Media {
    pub media_key: String,
    pub resource_record_key: String,
    #[serde(default, rename(deserialize = "MediaURL"))]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub media_category: Option<String>,
    #[serde(default)]
    pub image_size_description: Option<String>,
    #[serde(default)]
    pub media_status: Option<String>,
    #[serde(default, rename(deserialize = "Order"))]
    pub media_order: Option<i32>,
    #[serde(default, rename(deserialize = "PreferredPhotoYN"))]
    pub preferred_photo_yn: Option<bool>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub modification_timestamp: Option<String>,
    #[serde(default)]
    pub media_modification_timestamp: Option<String>,
}

impl ListingRecord for Media {
    const TABLE: &'static str = "media";
    const KEY_COLUMN: &'static str = "media_key";
    const COLUMNS: &'static [&'static str] = MEDIA_COLUMNS;

    fn natural_key(&self) -> &str {
        &self.media_key
    }
}

pub const ROOM_COLUMNS: &[&str] = &[
    "room_key",
    "listing_key",
    "room_type",
    "room_level",
    "room_length",
    "room_width",
    "room_length_width_units",
    "room_feature1",
    "room_feature2",
    "room_feature3",
    "room_description",
    "room_order",
    "modification_timestamp",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "PascalCase"))]
pub struct Room {
    pub room_key: String,
    pub listing_key: String,
    #[serde(default)]
    pub room_type: Option<String>,
    #[serde(default)]
    pub room_level: Option<String>,
    #[serde(default)]
    pub room_length: Option<f64>,
    #[serde(default)]
    pub room_width: Option<f64>,
    #[serde(default)]
    pub room_length_width_units: Option<String>,
    #[serde(default)]
    pub room_feature1: Option<String>,
    #[serde(default)]
    pub room_feature2: Option<String>,
    #[serde(default)]
    pub room_feature3: Option<String>,
    #[serde(default)]
    pub room_description: Option<String>,
    #[serde(default, rename(deserialize = "Order"))]
    pub room_order: Option<i32>,
    #[serde(default)]
    pub modification_timestamp: Option<String>,
}

impl ListingRecord for Room {
    const TABLE: &'static str = "property_rooms";
    const KEY_COLUMN: &'static str = "room_key";
    const COLUMNS: &'static [&'static str] = ROOM_COLUMNS;

    fn natural_key(&self) -> &str {
        &self.room_key
    }
}

pub const OPEN_HOUSE_COLUMNS: &[&str] = &[
    "open_house_key",
    "listing_key",
    "open_house_id",
    "open_house_date",
    "open_house_start_time",
    "open_house_end_time",
    "open_house_type",
    "open_house_status",
    "open_house_remarks",
    "modification_timestamp",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "PascalCase"))]
pub struct OpenHouse {
    pub open_house_key: String,
    pub listing_key: String,
    #[serde(default)]
    pub open_house_id: Option<String>,
    #[serde(default)]
    pub open_house_date: Option<String>,
    #[serde(default)]
    pub open_house_start_time: Option<String>,
    #[serde(default)]
    pub open_house_end_time: Option<String>,
    #[serde(default)]
    pub open_house_type: Option<String>,
    #[serde(default)]
    pub open_house_status: Option<String>,
    #[serde(default)]
    pub open_house_remarks: Option<String>,
    #[serde(default)]
    pub modification_timestamp: Option<String>,
}

impl ListingRecord for OpenHouse {
    const TABLE: &'static str = "open_house";
    const KEY_COLUMN: &'static str = "open_house_key";
    const COLUMNS: &'static [&'static str] = OPEN_HOUSE_COLUMNS;

    fn natural_key(&self) -> &str {
        &self.open_house_key
    }
}
