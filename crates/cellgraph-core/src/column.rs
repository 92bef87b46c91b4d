//! Column types

/// Column metadata
///
/// Rows carry their own metadata on the row record; columns have no cell
/// storage of their own, so their settings live in a separate map keyed by
/// the 1-based column index.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    /// Column index (1-based)
    pub index: u16,
    /// Custom width (None = default)
    pub width: Option<f64>,
    /// Column is hidden
    pub hidden: bool,
    /// Column-level style id (None = no column style)
    pub style_id: Option<u32>,
}

impl Column {
    /// Create a new column with default settings
    pub fn new(index: u16) -> Self {
        Self {
            index,
            width: None,
            hidden: false,
            style_id: None,
        }
    }

    /// Check if this column has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.width.is_some() || self.hidden || self.style_id.is_some()
    }

    /// Copy of the settings placed at another index
    pub fn moved_to(&self, index: u16) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }
}
