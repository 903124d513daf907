//! Hardware capability lookup
//!
//! The runtime exposes its compressed-texture support as named boolean
//! features. The negotiator only ever asks through [`HardwareFeatures`], so any
//! renderer can plug in: a fixed [`FeatureSet`], a closure, or the feature bits
//! of a live `wgpu` device.

use std::collections::BTreeSet;

/// Feature keys queried by the negotiator
pub mod feature {
    /// BC6H/BC7
    pub const BPTC: &str = "bptc";
    /// BC1-BC3
    pub const S3TC: &str = "s3tc";
    /// ETC1
    pub const ETC: &str = "etc";
    /// ETC2 / EAC
    pub const ETC2: &str = "etc2";
    /// BC4/BC5
    pub const RGTC: &str = "rgtc";

    pub const ALL: [&str; 5] = [BPTC, S3TC, ETC, ETC2, RGTC];
}

/// Read-only view of the runtime's supported features
pub trait HardwareFeatures {
    fn has_feature(&self, name: &str) -> bool;
}

impl<F: Fn(&str) -> bool> HardwareFeatures for F {
    fn has_feature(&self, name: &str) -> bool {
        self(name)
    }
}

/// A fixed set of feature names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    names: BTreeSet<String>,
}

impl FeatureSet {
    /// No compressed formats at all
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str) -> Self {
        self.insert(name);
        self
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_owned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Snapshot the negotiator-relevant keys of another feature source
    pub fn snapshot(source: &impl HardwareFeatures) -> Self {
        Self::from_names(feature::ALL.into_iter().filter(|name| source.has_feature(name)))
    }
}

impl HardwareFeatures for FeatureSet {
    fn has_feature(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

impl std::fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// `wgpu` groups BC1-BC7 under one feature bit and ETC1/ETC2/EAC under another.
impl HardwareFeatures for wgpu::Features {
    fn has_feature(&self, name: &str) -> bool {
        match name {
            feature::BPTC | feature::S3TC | feature::RGTC => {
                self.contains(wgpu::Features::TEXTURE_COMPRESSION_BC)
            }
            feature::ETC | feature::ETC2 => self.contains(wgpu::Features::TEXTURE_COMPRESSION_ETC2),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_set_lookup() {
        let set = FeatureSet::none().with(feature::S3TC).with(feature::ETC2);
        assert!(set.has_feature("s3tc"));
        assert!(set.has_feature("etc2"));
        assert!(!set.has_feature("bptc"));
        assert!(!set.has_feature("etc"));
        assert_eq!(set.to_string(), "[etc2, s3tc]");
    }

    #[test]
    fn test_closure_features() {
        let only_rgtc = |name: &str| name == feature::RGTC;
        assert!(only_rgtc.has_feature("rgtc"));
        assert!(!only_rgtc.has_feature("s3tc"));

        let snapshot = FeatureSet::snapshot(&only_rgtc);
        assert_eq!(snapshot, FeatureSet::from_names(["rgtc"]));
    }

    #[test]
    fn test_wgpu_features() {
        let bc = wgpu::Features::TEXTURE_COMPRESSION_BC;
        assert!(bc.has_feature(feature::BPTC));
        assert!(bc.has_feature(feature::S3TC));
        assert!(bc.has_feature(feature::RGTC));
        assert!(!bc.has_feature(feature::ETC2));

        let etc = wgpu::Features::TEXTURE_COMPRESSION_ETC2;
        assert!(etc.has_feature(feature::ETC));
        assert!(etc.has_feature(feature::ETC2));
        assert!(!etc.has_feature(feature::S3TC));

        assert!(!wgpu::Features::empty().has_feature(feature::S3TC));
    }
}
