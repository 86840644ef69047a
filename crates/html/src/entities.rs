//! Character reference decoding
//!
//! HTML mode knows the full named table below and remaps the C1 range the
//! way browsers do. XML mode only accepts the five predefined names and
//! rejects code points that are not XML characters.

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Named character references known to the HTML parser
const ENTITY_TABLE: &[(&str, &str)] = &[
    // Essential entities
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),

    // ISO 8859-1 (Latin-1) Symbols
    ("nbsp", "\u{00A0}"),
    ("iexcl", "\u{00A1}"),
    ("cent", "\u{00A2}"),
    ("pound", "\u{00A3}"),
    ("curren", "\u{00A4}"),
    ("yen", "\u{00A5}"),
    ("brvbar", "\u{00A6}"),
    ("sect", "\u{00A7}"),
    ("uml", "\u{00A8}"),
    ("copy", "\u{00A9}"),
    ("ordf", "\u{00AA}"),
    ("laquo", "\u{00AB}"),
    ("not", "\u{00AC}"),
    ("shy", "\u{00AD}"),
    ("reg", "\u{00AE}"),
    ("macr", "\u{00AF}"),
    ("deg", "\u{00B0}"),
    ("plusmn", "\u{00B1}"),
    ("sup2", "\u{00B2}"),
    ("sup3", "\u{00B3}"),
    ("acute", "\u{00B4}"),
    ("micro", "\u{00B5}"),
    ("para", "\u{00B6}"),
    ("middot", "\u{00B7}"),
    ("cedil", "\u{00B8}"),
    ("sup1", "\u{00B9}"),
    ("ordm", "\u{00BA}"),
    ("raquo", "\u{00BB}"),
    ("frac14", "\u{00BC}"),
    ("frac12", "\u{00BD}"),
    ("frac34", "\u{00BE}"),
    ("iquest", "\u{00BF}"),
    ("times", "\u{00D7}"),
    ("divide", "\u{00F7}"),

    // Latin Extended Characters
    ("Agrave", "\u{00C0}"),
    ("Aacute", "\u{00C1}"),
    ("Acirc", "\u{00C2}"),
    ("Atilde", "\u{00C3}"),
    ("Auml", "\u{00C4}"),
    ("Aring", "\u{00C5}"),
    ("AElig", "\u{00C6}"),
    ("Ccedil", "\u{00C7}"),
    ("Egrave", "\u{00C8}"),
    ("Eacute", "\u{00C9}"),
    ("Ecirc", "\u{00CA}"),
    ("Euml", "\u{00CB}"),
    ("Igrave", "\u{00CC}"),
    ("Iacute", "\u{00CD}"),
    ("Icirc", "\u{00CE}"),
    ("Iuml", "\u{00CF}"),
    ("ETH", "\u{00D0}"),
    ("Ntilde", "\u{00D1}"),
    ("Ograve", "\u{00D2}"),
    ("Oacute", "\u{00D3}"),
    ("Ocirc", "\u{00D4}"),
    ("Otilde", "\u{00D5}"),
    ("Ouml", "\u{00D6}"),
    ("Oslash", "\u{00D8}"),
    ("Ugrave", "\u{00D9}"),
    ("Uacute", "\u{00DA}"),
    ("Ucirc", "\u{00DB}"),
    ("Uuml", "\u{00DC}"),
    ("Yacute", "\u{00DD}"),
    ("THORN", "\u{00DE}"),
    ("szlig", "\u{00DF}"),
    ("agrave", "\u{00E0}"),
    ("aacute", "\u{00E1}"),
    ("acirc", "\u{00E2}"),
    ("atilde", "\u{00E3}"),
    ("auml", "\u{00E4}"),
    ("aring", "\u{00E5}"),
    ("aelig", "\u{00E6}"),
    ("ccedil", "\u{00E7}"),
    ("egrave", "\u{00E8}"),
    ("eacute", "\u{00E9}"),
    ("ecirc", "\u{00EA}"),
    ("euml", "\u{00EB}"),
    ("igrave", "\u{00EC}"),
    ("iacute", "\u{00ED}"),
    ("icirc", "\u{00EE}"),
    ("iuml", "\u{00EF}"),
    ("eth", "\u{00F0}"),
    ("ntilde", "\u{00F1}"),
    ("ograve", "\u{00F2}"),
    ("oacute", "\u{00F3}"),
    ("ocirc", "\u{00F4}"),
    ("otilde", "\u{00F5}"),
    ("ouml", "\u{00F6}"),
    ("oslash", "\u{00F8}"),
    ("ugrave", "\u{00F9}"),
    ("uacute", "\u{00FA}"),
    ("ucirc", "\u{00FB}"),
    ("uuml", "\u{00FC}"),
    ("yacute", "\u{00FD}"),
    ("thorn", "\u{00FE}"),
    ("yuml", "\u{00FF}"),
    ("OElig", "\u{0152}"),
    ("oelig", "\u{0153}"),
    ("Scaron", "\u{0160}"),
    ("scaron", "\u{0161}"),
    ("Yuml", "\u{0178}"),
    ("fnof", "\u{0192}"),

    // Greek Letters
    ("Alpha", "\u{0391}"),
    ("Beta", "\u{0392}"),
    ("Gamma", "\u{0393}"),
    ("Delta", "\u{0394}"),
    ("Epsilon", "\u{0395}"),
    ("Zeta", "\u{0396}"),
    ("Eta", "\u{0397}"),
    ("Theta", "\u{0398}"),
    ("Iota", "\u{0399}"),
    ("Kappa", "\u{039A}"),
    ("Lambda", "\u{039B}"),
    ("Mu", "\u{039C}"),
    ("Nu", "\u{039D}"),
    ("Xi", "\u{039E}"),
    ("Omicron", "\u{039F}"),
    ("Pi", "\u{03A0}"),
    ("Rho", "\u{03A1}"),
    ("Sigma", "\u{03A3}"),
    ("Tau", "\u{03A4}"),
    ("Upsilon", "\u{03A5}"),
    ("Phi", "\u{03A6}"),
    ("Chi", "\u{03A7}"),
    ("Psi", "\u{03A8}"),
    ("Omega", "\u{03A9}"),
    ("alpha", "\u{03B1}"),
    ("beta", "\u{03B2}"),
    ("gamma", "\u{03B3}"),
    ("delta", "\u{03B4}"),
    ("epsilon", "\u{03B5}"),
    ("zeta", "\u{03B6}"),
    ("eta", "\u{03B7}"),
    ("theta", "\u{03B8}"),
    ("iota", "\u{03B9}"),
    ("kappa", "\u{03BA}"),
    ("lambda", "\u{03BB}"),
    ("mu", "\u{03BC}"),
    ("nu", "\u{03BD}"),
    ("xi", "\u{03BE}"),
    ("omicron", "\u{03BF}"),
    ("pi", "\u{03C0}"),
    ("rho", "\u{03C1}"),
    ("sigmaf", "\u{03C2}"),
    ("sigma", "\u{03C3}"),
    ("tau", "\u{03C4}"),
    ("upsilon", "\u{03C5}"),
    ("phi", "\u{03C6}"),
    ("chi", "\u{03C7}"),
    ("psi", "\u{03C8}"),
    ("omega", "\u{03C9}"),
    ("thetasym", "\u{03D1}"),
    ("upsih", "\u{03D2}"),
    ("piv", "\u{03D6}"),

    // General Punctuation
    ("ensp", "\u{2002}"),
    ("emsp", "\u{2003}"),
    ("thinsp", "\u{2009}"),
    ("zwnj", "\u{200C}"),
    ("zwj", "\u{200D}"),
    ("lrm", "\u{200E}"),
    ("rlm", "\u{200F}"),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("sbquo", "\u{201A}"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("bdquo", "\u{201E}"),
    ("dagger", "\u{2020}"),
    ("Dagger", "\u{2021}"),
    ("bull", "\u{2022}"),
    ("hellip", "\u{2026}"),
    ("permil", "\u{2030}"),
    ("prime", "\u{2032}"),
    ("Prime", "\u{2033}"),
    ("lsaquo", "\u{2039}"),
    ("rsaquo", "\u{203A}"),
    ("oline", "\u{203E}"),
    ("frasl", "\u{2044}"),

    // Currency Symbols
    ("euro", "\u{20AC}"),

    // Letterlike Symbols
    ("weierp", "\u{2118}"),
    ("image", "\u{2111}"),
    ("real", "\u{211C}"),
    ("trade", "\u{2122}"),
    ("alefsym", "\u{2135}"),

    // Arrows
    ("larr", "\u{2190}"),
    ("uarr", "\u{2191}"),
    ("rarr", "\u{2192}"),
    ("darr", "\u{2193}"),
    ("harr", "\u{2194}"),
    ("crarr", "\u{21B5}"),
    ("lArr", "\u{21D0}"),
    ("uArr", "\u{21D1}"),
    ("rArr", "\u{21D2}"),
    ("dArr", "\u{21D3}"),
    ("hArr", "\u{21D4}"),

    // Mathematical Operators
    ("forall", "\u{2200}"),
    ("part", "\u{2202}"),
    ("exist", "\u{2203}"),
    ("empty", "\u{2205}"),
    ("nabla", "\u{2207}"),
    ("isin", "\u{2208}"),
    ("notin", "\u{2209}"),
    ("ni", "\u{220B}"),
    ("prod", "\u{220F}"),
    ("sum", "\u{2211}"),
    ("minus", "\u{2212}"),
    ("lowast", "\u{2217}"),
    ("radic", "\u{221A}"),
    ("prop", "\u{221D}"),
    ("infin", "\u{221E}"),
    ("ang", "\u{2220}"),
    ("and", "\u{2227}"),
    ("or", "\u{2228}"),
    ("cap", "\u{2229}"),
    ("cup", "\u{222A}"),
    ("int", "\u{222B}"),
    ("there4", "\u{2234}"),
    ("sim", "\u{223C}"),
    ("cong", "\u{2245}"),
    ("asymp", "\u{2248}"),
    ("ne", "\u{2260}"),
    ("equiv", "\u{2261}"),
    ("le", "\u{2264}"),
    ("ge", "\u{2265}"),
    ("sub", "\u{2282}"),
    ("sup", "\u{2283}"),
    ("nsub", "\u{2284}"),
    ("sube", "\u{2286}"),
    ("supe", "\u{2287}"),
    ("oplus", "\u{2295}"),
    ("otimes", "\u{2297}"),
    ("perp", "\u{22A5}"),
    ("sdot", "\u{22C5}"),

    // Miscellaneous Technical
    ("lceil", "\u{2308}"),
    ("rceil", "\u{2309}"),
    ("lfloor", "\u{230A}"),
    ("rfloor", "\u{230B}"),
    ("lang", "\u{2329}"),
    ("rang", "\u{232A}"),

    // Geometric Shapes
    ("loz", "\u{25CA}"),

    // Miscellaneous Symbols
    ("spades", "\u{2660}"),
    ("clubs", "\u{2663}"),
    ("hearts", "\u{2665}"),
    ("diams", "\u{2666}"),

    // Additional useful entities
    ("circ", "\u{02C6}"),
    ("tilde", "\u{02DC}"),
];

static ENTITIES: LazyLock<FxHashMap<&'static str, &'static str>> =
    LazyLock::new(|| ENTITY_TABLE.iter().copied().collect());

/// The five references XML defines without a DTD
const XML_PREDEFINED: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
];

/// Decode an HTML entity (without the & and ;)
pub fn decode_entity(name: &str) -> Option<&'static str> {
    ENTITIES.get(name).copied()
}

/// Decode an XML predefined entity
pub fn decode_xml_entity(name: &str) -> Option<&'static str> {
    XML_PREDEFINED
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| *v)
}

fn parse_code_point(s: &str) -> Option<u32> {
    if let Some(hex) = s.strip_prefix('x').or_else(|| s.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<u32>().ok()
    }
}

/// Decode a numeric reference in XML mode; invalid code points are errors
pub fn decode_numeric_xml(s: &str) -> Option<char> {
    let value = parse_code_point(s)?;
    match value {
        0x9 | 0xA | 0xD | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF => {
            char::from_u32(value)
        }
        _ => None,
    }
}

/// Decode a numeric entity (&#123; or &#x7B;)
pub fn decode_numeric(s: &str) -> Option<char> {
    let value = parse_code_point(s)?;

    // Handle special replacements per HTML5 spec
    let value = match value {
        0x00 => 0xFFFD,                           // NULL -> REPLACEMENT CHARACTER
        0x80 => 0x20AC,                           // EURO SIGN
        0x82 => 0x201A,                           // SINGLE LOW-9 QUOTATION MARK
        0x83 => 0x0192,                           // LATIN SMALL LETTER F WITH HOOK
        0x84 => 0x201E,                           // DOUBLE LOW-9 QUOTATION MARK
        0x85 => 0x2026,                           // HORIZONTAL ELLIPSIS
        0x86 => 0x2020,                           // DAGGER
        0x87 => 0x2021,                           // DOUBLE DAGGER
        0x88 => 0x02C6,                           // MODIFIER LETTER CIRCUMFLEX ACCENT
        0x89 => 0x2030,                           // PER MILLE SIGN
        0x8A => 0x0160,                           // LATIN CAPITAL LETTER S WITH CARON
        0x8B => 0x2039,                           // SINGLE LEFT-POINTING ANGLE QUOTATION MARK
        0x8C => 0x0152,                           // LATIN CAPITAL LIGATURE OE
        0x8E => 0x017D,                           // LATIN CAPITAL LETTER Z WITH CARON
        0x91 => 0x2018,                           // LEFT SINGLE QUOTATION MARK
        0x92 => 0x2019,                           // RIGHT SINGLE QUOTATION MARK
        0x93 => 0x201C,                           // LEFT DOUBLE QUOTATION MARK
        0x94 => 0x201D,                           // RIGHT DOUBLE QUOTATION MARK
        0x95 => 0x2022,                           // BULLET
        0x96 => 0x2013,                           // EN DASH
        0x97 => 0x2014,                           // EM DASH
        0x98 => 0x02DC,                           // SMALL TILDE
        0x99 => 0x2122,                           // TRADE MARK SIGN
        0x9A => 0x0161,                           // LATIN SMALL LETTER S WITH CARON
        0x9B => 0x203A,                           // SINGLE RIGHT-POINTING ANGLE QUOTATION MARK
        0x9C => 0x0153,                           // LATIN SMALL LIGATURE OE
        0x9E => 0x017E,                           // LATIN SMALL LETTER Z WITH CARON
        0x9F => 0x0178,                           // LATIN CAPITAL LETTER Y WITH DIAERESIS
        // Surrogate range is invalid
        0xD800..=0xDFFF => 0xFFFD,
        // Values above max Unicode are invalid
        v if v > 0x10FFFF => 0xFFFD,
        v => v,
    };

    char::from_u32(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_essential_entities() {
        assert_eq!(decode_entity("amp"), Some("&"));
        assert_eq!(decode_entity("lt"), Some("<"));
        assert_eq!(decode_entity("gt"), Some(">"));
        assert_eq!(decode_entity("quot"), Some("\""));
        assert_eq!(decode_entity("apos"), Some("'"));
    }

    #[test]
    fn test_common_entities() {
        assert_eq!(decode_entity("nbsp"), Some("\u{00A0}"));
        assert_eq!(decode_entity("copy"), Some("\u{00A9}"));
        assert_eq!(decode_entity("reg"), Some("\u{00AE}"));
        assert_eq!(decode_entity("trade"), Some("\u{2122}"));
        assert_eq!(decode_entity("euro"), Some("\u{20AC}"));
    }

    #[test]
    fn test_unknown_entity() {
        assert_eq!(decode_entity("unknown"), None);
        assert_eq!(decode_entity("notanentity"), None);
    }

    #[test]
    fn test_decode_numeric_decimal() {
        assert_eq!(decode_numeric("65"), Some('A'));
        assert_eq!(decode_numeric("97"), Some('a'));
        assert_eq!(decode_numeric("8364"), Some('€'));
        assert_eq!(decode_numeric("169"), Some('©'));
    }

    #[test]
    fn test_decode_numeric_hex() {
        assert_eq!(decode_numeric("x41"), Some('A'));
        assert_eq!(decode_numeric("X41"), Some('A'));
        assert_eq!(decode_numeric("x61"), Some('a'));
        assert_eq!(decode_numeric("x20AC"), Some('€'));
    }

    #[test]
    fn test_decode_numeric_special_replacements() {
        // NULL -> REPLACEMENT CHARACTER
        assert_eq!(decode_numeric("0"), Some('\u{FFFD}'));
        // Windows-1252 to Unicode mappings
        assert_eq!(decode_numeric("128"), Some('€'));      // 0x80 -> euro
        assert_eq!(decode_numeric("145"), Some('\u{2018}')); // 0x91 -> left single quote
        assert_eq!(decode_numeric("146"), Some('\u{2019}')); // 0x92 -> right single quote
    }

    #[test]
    fn test_decode_numeric_invalid() {
        // Surrogate range
        assert_eq!(decode_numeric("55296"), Some('\u{FFFD}')); // 0xD800
        assert_eq!(decode_numeric("57343"), Some('\u{FFFD}')); // 0xDFFF
        // Above max Unicode
        assert_eq!(decode_numeric("1114112"), Some('\u{FFFD}')); // 0x110000
    }

    #[test]
    fn test_xml_predefined_only() {
        assert_eq!(decode_xml_entity("amp"), Some("&"));
        assert_eq!(decode_xml_entity("apos"), Some("'"));
        assert_eq!(decode_xml_entity("nbsp"), None);
    }

    #[test]
    fn test_decode_numeric_xml() {
        assert_eq!(decode_numeric_xml("x41"), Some('A'));
        assert_eq!(decode_numeric_xml("128"), Some('\u{0080}'));
        assert_eq!(decode_numeric_xml("0"), None);
        assert_eq!(decode_numeric_xml("55296"), None);
        assert_eq!(decode_numeric_xml("zz"), None);
    }
}
