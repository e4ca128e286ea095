//! Font fallback chain configuration.

/// Fallback font families in priority order.
///
/// These fonts are searched in order when the primary font doesn't have a
/// glyph. The order covers monospace fonts first, then CJK, then symbol and
/// emoji fonts for broad Unicode coverage.
pub const FALLBACK_FAMILIES: &[&str] = &[
    // Standard monospace fonts
    "JetBrains Mono",
    "Fira Code",
    "Consolas",
    "Monaco",
    "Menlo",
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Courier New",
    // CJK fonts
    "Noto Sans CJK JP",
    "Noto Sans CJK SC",
    "Noto Sans CJK TC",
    "Noto Sans CJK KR",
    "Microsoft YaHei",
    "MS Gothic",
    // Symbol fonts
    "Apple Symbols",
    "Segoe UI Symbol",
    "Noto Sans Symbols",
    "Noto Sans Symbols 2",
    "DejaVu Sans",
    "Symbola",
    // Color emoji fonts
    "Noto Color Emoji",
    "Apple Color Emoji",
    "Segoe UI Emoji",
];
