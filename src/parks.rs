//! Closed table of parks the assistant serves.
//!
//! The short code is what users type (`--park km`), the display name is what
//! the answering service filters its knowledge base on, and the style key
//! selects the accent colour in the terminal UI.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Park {
    pub code: &'static str,
    pub name: &'static str,
    pub style: &'static str,
}

const PARKS: &[Park] = &[
    Park { code: "gl", name: "Gröna Lund",       style: "gronalund" },
    Park { code: "fv", name: "Furuvik",          style: "furuvik" },
    Park { code: "km", name: "Kolmården",        style: "kolmarden" },
    Park { code: "ss", name: "Skara Sommarland", style: "sommarland" },
];

/// Used for any code outside the table.
pub const DEFAULT_PARK: Park = Park {
    code: "",
    name: "Parks and Resorts",
    style: "default",
};

/// Resolve a short code, case-insensitively. Never fails.
pub fn resolve(code: &str) -> Park {
    let code = code.trim();
    PARKS
        .iter()
        .find(|p| p.code.eq_ignore_ascii_case(code))
        .copied()
        .unwrap_or(DEFAULT_PARK)
}

pub fn all() -> &'static [Park] {
    PARKS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_codes() {
        assert_eq!(resolve("gl").name, "Gröna Lund");
        assert_eq!(resolve("km").name, "Kolmården");
        assert_eq!(resolve("ss").style, "sommarland");
    }

    #[test]
    fn test_resolve_ignores_case_and_whitespace() {
        assert_eq!(resolve(" FV ").name, "Furuvik");
    }

    #[test]
    fn test_unknown_code_falls_back_to_default() {
        assert_eq!(resolve("xx"), DEFAULT_PARK);
        assert_eq!(resolve(""), DEFAULT_PARK);
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in all().iter().enumerate() {
            for b in &all()[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }
}
