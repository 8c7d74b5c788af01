use crate::{
    artefacts::ArtefactConfig,
    clipping::ClippingThresholds,
    detectors::{EcgConfig, EcgMethod, PpgConfig, RspConfig, RspKind},
    error::{PulseError, Result},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Settings for every pipeline, as read from a TOML file. Missing tables and
/// keys keep their defaults.
///
/// ```toml
/// [ppg]
/// clipping_thresholds = "none,255"
/// clean_extra = true
///
/// [ecg]
/// method = "hamilton"
/// find_local = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub ppg: PpgConfig,
    pub ecg: EcgConfig,
    pub rsp: RspConfig,
    pub artefacts: ArtefactConfig,
}

impl DetectionConfig {
    /// Parse and validate. Malformed TOML is a `Parse` error; a detector
    /// name or threshold spec that does not parse keeps its own error kind.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let value: toml::Value =
            toml::from_str(contents).map_err(|e| PulseError::Parse(e.to_string()))?;
        check_named_values(&value)?;
        let cfg = DetectionConfig::deserialize(value)
            .map_err(|e| PulseError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.ppg.validate()?;
        self.ecg.validate()?;
        self.rsp.validate()?;
        self.artefacts.validate()
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| PulseError::Parse(e.to_string()))
    }
}

/// Run the string-valued fields through their parsers before serde sees them.
fn check_named_values(value: &toml::Value) -> Result<()> {
    let field = |table: &str, key: &str| value.get(table).and_then(|t| t.get(key));
    if let Some(method) = field("ecg", "method") {
        let name = method.as_str().ok_or_else(|| {
            PulseError::UnknownMethod(format!("expected a detector name, got {}", method))
        })?;
        name.parse::<EcgMethod>()?;
    }
    if let Some(spec) = field("ppg", "clipping_thresholds") {
        let text = spec.as_str().ok_or_else(|| {
            PulseError::InvalidThresholdSpec(format!(
                "expected \"auto\", \"none\" or \"min,max\", got {}",
                spec
            ))
        })?;
        text.parse::<ClippingThresholds>()?;
    }
    if let Some(kind) = field("rsp", "kind").and_then(toml::Value::as_str) {
        kind.parse::<RspKind>()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clipping::{ClippingBounds, ClippingThresholds},
        detectors::{EcgMethod, RspKind},
    };
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(
            DetectionConfig::from_toml_str("").unwrap(),
            DetectionConfig::default()
        );
    }

    #[test]
    fn partial_tables_override_defaults() {
        let cfg = DetectionConfig::from_toml_str(
            r#"
            [ppg]
            clipping_thresholds = "none,255"
            clean_extra = true

            [ecg]
            method = "engelse-zeelenberg"

            [rsp]
            kind = "troughs"

            [artefacts]
            alpha = 6.0
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.ppg.clipping_thresholds,
            ClippingThresholds::Bounds(ClippingBounds::new(None, Some(255.0)))
        );
        assert!(cfg.ppg.clean_extra);
        assert_eq!(cfg.ppg.win, 0.75);
        assert_eq!(cfg.ecg.method, EcgMethod::EngelseZeelenberg);
        assert_eq!(cfg.rsp.kind, RspKind::Troughs);
        assert_eq!(cfg.artefacts.alpha, 6.0);
        assert_eq!(cfg.artefacts.c1, 0.13);
    }

    #[test]
    fn bad_values_keep_their_error_kind() {
        assert!(matches!(
            DetectionConfig::from_toml_str("[ecg]\nmethod = \"christov\"\n"),
            Err(PulseError::UnknownMethod(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("[ppg]\nclipping_thresholds = \"250\"\n"),
            Err(PulseError::InvalidThresholdSpec(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("[ppg]\nclipping_thresholds = 250\n"),
            Err(PulseError::InvalidThresholdSpec(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("[rsp]\nkind = \"trough\"\n"),
            Err(PulseError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("[rsp]\nwin = 0.0\n"),
            Err(PulseError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("[ecg]\nfind_local = \"yes\"\n"),
            Err(PulseError::Parse(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("[ecg\n"),
            Err(PulseError::Parse(_))
        ));
    }

    #[test]
    fn round_trips_through_a_file() {
        let mut cfg = DetectionConfig::default();
        cfg.ecg.find_local = true;
        cfg.ppg.clipping_thresholds = ClippingThresholds::Disabled;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", cfg.to_toml_string().unwrap()).unwrap();
        assert_eq!(DetectionConfig::load(file.path()).unwrap(), cfg);
    }
}
