//! Embedded label typeface.
//!
//! The font is compiled into the binary and loaded into a font database
//! exactly once per process. The rasterizer only ever sees this database, so
//! label glyphs are identical on hosts with and without system fonts.

use base64::{engine::general_purpose::STANDARD, Engine};
use resvg::usvg::fontdb;
use std::sync::{Arc, OnceLock};

/// DejaVu Sans Bold (Bitstream Vera derived, free license; see fonts/LICENSE).
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans-Bold.ttf");

/// Family name the overlay markup declares through `@font-face`.
pub const FONT_FAMILY: &str = "WatermarkFont";

/// Family name stored inside the embedded font file.
pub const EMBEDDED_FAMILY: &str = "DejaVu Sans";

static FONT_DB: OnceLock<Arc<fontdb::Database>> = OnceLock::new();
static FONT_BASE64: OnceLock<String> = OnceLock::new();

/// Raw TrueType bytes of the label font.
pub fn font_data() -> &'static [u8] {
    EMBEDDED_FONT_DATA
}

/// Base64 form of the font, for `data:` URLs in overlay markup.
pub fn font_base64() -> &'static str {
    FONT_BASE64.get_or_init(|| STANDARD.encode(EMBEDDED_FONT_DATA))
}

/// Shared font database containing only the embedded font.
///
/// The embedded family also backs the generic `sans-serif` family, so any
/// label that falls through the `font-family` list still resolves to it.
pub fn font_database() -> Arc<fontdb::Database> {
    FONT_DB
        .get_or_init(|| {
            let mut db = fontdb::Database::new();
            db.load_font_data(EMBEDDED_FONT_DATA.to_vec());
            db.set_sans_serif_family(EMBEDDED_FAMILY);
            tracing::debug!(faces = db.len(), "Loaded embedded watermark font");
            Arc::new(db)
        })
        .clone()
}

/// CSS `font-family` list referenced by every label.
pub fn font_family_list() -> String {
    format!("{}, '{}', sans-serif", FONT_FAMILY, EMBEDDED_FAMILY)
}
