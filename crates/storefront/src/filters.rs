//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use autoparts_core::{Ksh, format_phone_display, format::format_sku};
use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Path of the stylesheet, content-hashed when the build script produced one.
///
/// Usage in templates: `{{ ""|css_href }}`
#[askama::filter_fn]
pub fn css_href(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(asset_href("css", "main", "css", env!("CSS_HASH")))
}

/// Path of `app.js`, content-hashed like the stylesheet.
///
/// Usage in templates: `{{ ""|js_href }}`
#[askama::filter_fn]
pub fn js_href(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(asset_href("js", "app", "js", env!("JS_HASH")))
}

fn asset_href(dir: &str, stem: &str, ext: &str, hash: &str) -> String {
    if hash.is_empty() {
        format!("/static/{dir}/{stem}.{ext}")
    } else {
        format!("/static/{dir}/derived/{stem}.{hash}.{ext}")
    }
}

/// Format a raw decimal amount as shillings.
///
/// Usage in templates: `{{ bucket.revenue|ksh }}`
#[askama::filter_fn]
pub fn ksh(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(raw
        .trim()
        .parse::<Decimal>()
        .map_or(raw, |amount| Ksh::new(amount).display()))
}

/// `254722123456` as `0722 123456`.
///
/// Usage in templates: `{{ user.phone_number|phone }}`
#[askama::filter_fn]
pub fn phone(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_phone_display(&value.to_string()))
}

/// Usage in templates: `{{ product.sku|sku }}`
#[askama::filter_fn]
pub fn sku(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_sku(&value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_href() {
        assert_eq!(asset_href("css", "main", "css", ""), "/static/css/main.css");
        assert_eq!(
            asset_href("js", "app", "js", "1a2b3c4d"),
            "/static/js/derived/app.1a2b3c4d.js"
        );
    }
}
