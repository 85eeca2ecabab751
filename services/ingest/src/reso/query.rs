//! URL construction for the RESO OData endpoints.
//!
//! Templates come from configuration as plain text. Substituted values are OData-escaped and
//! percent-encoded so a key can never break out of its string literal or the query string.

use chrono::NaiveDate;
use mlsync_db::sync_state::models::Cursor;

pub const LAST_TIMESTAMP_PLACEHOLDER: &str = "@lastTimestamp";
pub const LAST_KEY_PLACEHOLDER: &str = "@lastKey";
pub const PROPERTY_KEY_PLACEHOLDER: &str = "@propertyKey";

/// Largest media page requested for a single property.
pub const MEDIA_PAGE_SIZE: u32 = 500;

/// Double single quotes so `value` is safe inside an OData string literal.
pub fn escape_odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn encode_literal(value: &str) -> String {
    urlencoding::encode(&escape_odata_literal(value)).into_owned()
}

/// Append `params` to `url`, choosing `?` or `&` depending on whether a query already exists.
pub fn append_query(url: &str, params: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{params}")
}

/// Catalog template with the cursor substituted in.
pub fn with_cursor(template: &str, cursor: &Cursor) -> String {
    template
        .replace(
            LAST_TIMESTAMP_PLACEHOLDER,
            &urlencoding::encode(&cursor.last_timestamp),
        )
        .replace(LAST_KEY_PLACEHOLDER, &encode_literal(&cursor.last_key))
}

/// Count-only query at `cursor`: no rows, just `@odata.count`.
pub fn count_url(template: &str, cursor: &Cursor) -> String {
    append_query(&with_cursor(template, cursor), "$top=0&$count=true")
}

pub fn batch_url(template: &str, cursor: &Cursor, batch_size: u32) -> String {
    append_query(&with_cursor(template, cursor), &format!("$top={batch_size}"))
}

/// Active, largest-size media for one property.
pub fn media_url(base: &str, listing_key: &str) -> String {
    let filter = format!(
        "ResourceRecordKey eq '{}' and MediaStatus eq 'Active' and ImageSizeDescription eq 'Largest'",
        escape_odata_literal(listing_key)
    );
    append_query(
        base,
        &format!(
            "$filter={}&$top={MEDIA_PAGE_SIZE}",
            urlencoding::encode(&filter)
        ),
    )
}

pub fn rooms_url(template: &str, listing_key: &str) -> String {
    template.replace(PROPERTY_KEY_PLACEHOLDER, &encode_literal(listing_key))
}

/// Open houses for one property from `today` onwards.
pub fn open_house_url(base: &str, listing_key: &str, today: NaiveDate) -> String {
    let filter = format!(
        "ListingKey eq '{}' and OpenHouseDate ge {}",
        escape_odata_literal(listing_key),
        today.format("%Y-%m-%d")
    );
    append_query(
        base,
        &format!(
            "$filter={}&$orderby=OpenHouseKey",
            urlencoding::encode(&filter)
        ),
    )
}
