//! Parameter space and parameter vectors.
//!
//! Explorers work in the unit cube `[0, 1]^d`. A [`ParameterSpace`] maps those
//! points onto named feature ranges, snapping to each feature's increment, and
//! is the only way to build a [`ParameterVector`]. That keeps every drawn value
//! inside its declared `[min, max]`.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};

/// One dimension of the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name, used as the column name in the parameter table
    #[serde(rename = "feat")]
    pub name: String,

    /// Inclusive lower bound
    pub min: f64,

    /// Inclusive upper bound
    pub max: f64,

    /// Grid increment; continuous when absent
    #[serde(default, rename = "inc", skip_serializing_if = "Option::is_none")]
    pub increment: Option<f64>,

    /// Unit of measure, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
}

impl Feature {
    /// Continuous feature when `increment` is `None`, gridded otherwise.
    pub fn new(name: impl Into<String>, min: f64, max: f64, increment: Option<f64>) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            increment,
            uom: None,
        }
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Map a unit coordinate onto this feature's range and grid.
    fn project(&self, unit: f64) -> DomainResult<f64> {
        if !(0.0..=1.0).contains(&unit) {
            return Err(DomainError::ParameterOutOfBounds {
                feature: self.name.clone(),
                value: self.min + unit * self.span(),
                min: self.min,
                max: self.max,
            });
        }

        let raw = self.min + unit * self.span();
        let value = match self.increment {
            Some(inc) => {
                let mut snapped = self.min + ((raw - self.min) / inc).round() * inc;
                if snapped > self.max + inc * 1e-9 {
                    snapped -= inc;
                }
                snapped
            }
            None => raw,
        };
        Ok(value.clamp(self.min, self.max))
    }

    fn normalize(&self, value: f64) -> f64 {
        if self.span() == 0.0 {
            0.0
        } else {
            (value - self.min) / self.span()
        }
    }
}

/// The ordered set of features a campaign samples from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpace {
    features: Vec<Feature>,
    names: Arc<[String]>,
}

impl ParameterSpace {
    /// Build a space, rejecting malformed feature definitions.
    pub fn new(features: Vec<Feature>) -> DomainResult<Self> {
        if features.is_empty() {
            return Err(DomainError::config("parameter space defines no features"));
        }

        let mut seen = HashSet::new();
        for feature in &features {
            if feature.name.trim().is_empty() {
                return Err(DomainError::config("feature name cannot be empty"));
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(DomainError::config(format!(
                    "duplicate feature '{}'",
                    feature.name
                )));
            }
            if !feature.min.is_finite() || !feature.max.is_finite() {
                return Err(DomainError::config(format!(
                    "feature '{}' has a non-finite bound",
                    feature.name
                )));
            }
            if feature.min > feature.max {
                return Err(DomainError::config(format!(
                    "feature '{}' has min {} greater than max {}",
                    feature.name, feature.min, feature.max
                )));
            }
            if let Some(inc) = feature.increment {
                if !inc.is_finite() || inc <= 0.0 {
                    return Err(DomainError::config(format!(
                        "feature '{}' has invalid increment {inc}",
                        feature.name
                    )));
                }
            }
        }

        let names: Arc<[String]> = features.iter().map(|f| f.name.clone()).collect();
        Ok(Self { features, names })
    }

    /// Parse a YAML list of `{feat, min, max, inc}` entries.
    pub fn from_yaml_str(yaml: &str) -> DomainResult<Self> {
        let features: Vec<Feature> = serde_yaml::from_str(yaml)?;
        Self::new(features)
    }

    /// Load a parameter space definition from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> DomainResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DomainError::config(format!(
                "cannot read parameter space {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Features in column order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Number of features.
    pub fn dimension(&self) -> usize {
        self.features.len()
    }

    /// Feature names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Project a unit-cube point onto the space.
    pub fn project(&self, point: &[f64]) -> DomainResult<ParameterVector> {
        if point.len() != self.features.len() {
            return Err(DomainError::DataConsistency(format!(
                "point has {} coordinates but the space has {} features",
                point.len(),
                self.features.len()
            )));
        }

        let values = self
            .features
            .iter()
            .zip(point)
            .map(|(feature, &unit)| feature.project(unit))
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(ParameterVector {
            names: Arc::clone(&self.names),
            values,
        })
    }

    /// Inverse of [`project`](Self::project), up to grid snapping.
    pub fn normalize(&self, params: &ParameterVector) -> Vec<f64> {
        self.features
            .iter()
            .zip(params.values())
            .map(|(feature, &value)| feature.normalize(value))
            .collect()
    }

    /// Whether every coordinate lies inside the unit cube.
    pub fn contains_unit(&self, point: &[f64]) -> bool {
        point.len() == self.features.len() && point.iter().all(|u| (0.0..=1.0).contains(u))
    }
}

/// A named, bounded parameter vector drawn for one scenario run.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl ParameterVector {
    /// Value of feature `name`.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Like [`get`](Self::get) but a missing feature is a configuration error.
    pub fn require(&self, name: &str) -> DomainResult<f64> {
        self.get(name).ok_or_else(|| {
            DomainError::config(format!("parameter space has no feature '{name}'"))
        })
    }

    /// Values in column order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Feature names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no features.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for ParameterVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
