//! Series colors: fixed colors for known institutions, an ordinal palette for the rest.

use crate::models::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let h = s.trim().trim_start_matches('#');
        if h.len() != 6 || !h.is_ascii() {
            return None;
        }
        let p = |i: usize| u8::from_str_radix(&h[i..i + 2], 16).ok();
        Some(Self::rgb(p(0)?, p(2)?, p(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const WHITE: Color = Color::rgb(255, 255, 255);
/// Primary text.
pub const INK: Color = Color::rgb(15, 23, 42);
/// Axis ticks and secondary text.
pub const SLATE: Color = Color::rgb(71, 85, 105);
/// Fallback for entities without a known code.
pub const NEUTRAL: Color = Color::rgb(100, 116, 139);
pub const RULE: Color = Color::rgb(148, 163, 184);
pub const BORDER: Color = Color::rgb(226, 232, 240);
pub const TRACK: Color = Color::rgb(203, 213, 225);
pub const ERROR: Color = Color::rgb(185, 28, 28);
/// Slider handle fill and ring.
pub const HANDLE: Color = Color::rgb(17, 24, 39);
pub const HANDLE_RING: Color = Color::rgb(229, 231, 235);
pub const SELECTION: Color = Color::rgb(233, 236, 239);

/// d3 `schemeTableau10`.
const TABLEAU10: [Color; 10] = [
    Color::rgb(78, 121, 167),  // #4e79a7
    Color::rgb(242, 142, 44),  // #f28e2c
    Color::rgb(225, 87, 89),   // #e15759
    Color::rgb(118, 183, 178), // #76b7b2
    Color::rgb(89, 161, 79),   // #59a14f
    Color::rgb(237, 201, 73),  // #edc949
    Color::rgb(175, 122, 161), // #af7aa1
    Color::rgb(255, 157, 167), // #ff9da7
    Color::rgb(156, 117, 95),  // #9c755f
    Color::rgb(186, 176, 171), // #bab0ab
];

#[inline]
pub fn tableau10(idx: usize) -> Color {
    TABLEAU10[idx % TABLEAU10.len()]
}

/// Brand color of a known institution code (case-insensitive).
pub fn known_code_color(code: &str) -> Option<Color> {
    let c = match code.trim().to_ascii_uppercase().as_str() {
        "FONPLATA" => Color::rgb(0xc1, 0x12, 0x1f),
        "CAF" => Color::rgb(0x38, 0xb0, 0x00),
        "IADB" => Color::rgb(0x0e, 0x6b, 0xa8),
        "IBRD" => Color::rgb(0x5f, 0xa8, 0xd3),
        "CDB-CAR" => Color::rgb(0xea, 0x73, 0x17),
        "CABEI" => Color::rgb(0x7c, 0x3a, 0xed),
        _ => return None,
    };
    Some(c)
}

/// Color for an institution code, else `fallback`, else [`NEUTRAL`].
pub fn color_for_code(code: Option<&str>, fallback: Option<Color>) -> Color {
    code.and_then(known_code_color)
        .or(fallback)
        .unwrap_or(NEUTRAL)
}

/// Stable color for an entity: its brand color if known, else a palette slot by its
/// position in `order` (ids not in `order` take slots after it).
pub fn entity_color(id: EntityId, code: Option<&str>, order: &[EntityId]) -> Color {
    let slot = order
        .iter()
        .position(|k| *k == id)
        .unwrap_or_else(|| order.len() + id.unsigned_abs() as usize);
    color_for_code(code, Some(tableau10(slot)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_win_over_fallback() {
        assert_eq!(
            color_for_code(Some("caf"), Some(tableau10(0))).to_hex(),
            "#38b000"
        );
        assert_eq!(color_for_code(Some("XYZ"), Some(tableau10(1))), tableau10(1));
        assert_eq!(color_for_code(None, None), NEUTRAL);
    }

    #[test]
    fn hex_round_trip() {
        assert_eq!(Color::from_hex("#7c3aed").unwrap().to_hex(), "#7c3aed");
        assert!(Color::from_hex("#12").is_none());
    }

    #[test]
    fn entity_color_uses_order_slot() {
        let order = [25, 11];
        assert_eq!(entity_color(11, None, &order), tableau10(1));
        assert_eq!(entity_color(11, Some("IADB"), &order).to_hex(), "#0e6ba8");
    }
}
