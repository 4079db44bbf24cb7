use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Optional pre-sort applied to the registration order before packing.
///
/// `None` keeps insertion order, which is what the packer treats as authoritative.
/// All other orders are stable and break ties by key (ascending).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    None,
    HeightDesc,
    AreaDesc,
    MaxSideDesc,
    WidthDesc,
    NameAsc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::HeightDesc => "height_desc",
            Self::AreaDesc => "area_desc",
            Self::MaxSideDesc => "max_side_desc",
            Self::WidthDesc => "width_desc",
            Self::NameAsc => "name_asc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "insertion" => Ok(Self::None),
            "height_desc" => Ok(Self::HeightDesc),
            "area_desc" => Ok(Self::AreaDesc),
            "max_side_desc" => Ok(Self::MaxSideDesc),
            "width_desc" => Ok(Self::WidthDesc),
            "name_asc" => Ok(Self::NameAsc),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackerConfig {
    /// Pre-sort applied before packing (default: keep insertion order).
    #[serde(default)]
    pub sort_order: SortOrder,
    /// Decode sources in parallel (requires feature `parallel`).
    #[serde(default)]
    pub parallel: bool,
    /// Largest accepted sprite width/height in pixels.
    #[serde(default = "default_max_sprite_dimension")]
    pub max_sprite_dimension: u32,
    /// Canvas fill colour; transparent when unset.
    #[serde(default)]
    pub background_color: Option<[u8; 4]>,
    /// Draw red outlines around each sprite (debug).
    #[serde(default)]
    pub outlines: bool,
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            sort_order: SortOrder::None,
            parallel: false,
            max_sprite_dimension: default_max_sprite_dimension(),
            background_color: None,
            outlines: false,
        }
    }
}

impl PackerConfig {
    pub fn builder() -> PackerConfigBuilder {
        PackerConfigBuilder::new()
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SheetPackerError;

        if self.max_sprite_dimension == 0 {
            return Err(SheetPackerError::InvalidConfig(
                "max_sprite_dimension must be greater than zero".into(),
            ));
        }
        if self.parallel && !cfg!(feature = "parallel") {
            tracing::warn!("parallel decoding requested but the `parallel` feature is disabled");
        }
        Ok(())
    }
}

fn default_max_sprite_dimension() -> u32 {
    u16::MAX as u32
}

#[derive(Debug, Default, Clone)]
pub struct PackerConfigBuilder {
    cfg: PackerConfig,
}

impl PackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackerConfig::default(),
        }
    }
    pub fn sort_order(mut self, v: SortOrder) -> Self {
        self.cfg.sort_order = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn max_sprite_dimension(mut self, v: u32) -> Self {
        self.cfg.max_sprite_dimension = v;
        self
    }
    pub fn background_color(mut self, v: Option<[u8; 4]>) -> Self {
        self.cfg.background_color = v;
        self
    }
    pub fn outlines(mut self, v: bool) -> Self {
        self.cfg.outlines = v;
        self
    }
    pub fn build(self) -> PackerConfig {
        self.cfg
    }
}
