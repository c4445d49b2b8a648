use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ReinforceError, Result};
use crate::graph::{Graph, NodeId};
use crate::mat::Mat;

/// A named learnable matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub mat: Mat,
}

/// An ordered collection of named parameter matrices.
///
/// Iteration follows insertion order. Serialized as a map of name to
/// `{rows, cols, values}`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Net {
    params: Vec<Param>,
}

impl Net {
    pub fn new() -> Self {
        Net { params: Vec::new() }
    }

    /// Append a parameter. Names must be unique.
    pub fn push<S: Into<String>>(&mut self, name: S, mat: Mat) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(ReinforceError::invalid_parameter(name, "duplicate parameter name".to_string()));
        }
        self.params.push(Param { name, mat });
        Ok(())
    }

    pub fn with<S: Into<String>>(mut self, name: S, mat: Mat) -> Result<Self> {
        self.push(name, mat)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Mat> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.mat)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Mat> {
        self.params.iter_mut().find(|p| p.name == name).map(|p| &mut p.mat)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mat)> {
        self.params.iter().map(|p| (p.name.as_str(), &p.mat))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Mat)> {
        self.params.iter_mut().map(|p| (p.name.as_str(), &mut p.mat))
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Total number of scalar weights across all parameters.
    pub fn num_weights(&self) -> usize {
        self.params.iter().map(|p| p.mat.len()).sum()
    }

    pub fn zero_grads(&mut self) {
        for p in &mut self.params {
            p.mat.zero_grad();
        }
    }

    /// Move every parameter into `graph` for one pass. The returned ids follow
    /// parameter order and must be handed back to [`Net::reclaim`].
    pub fn lend(&mut self, graph: &mut Graph) -> Vec<NodeId> {
        self.params
            .iter_mut()
            .map(|p| graph.leaf(std::mem::take(&mut p.mat)))
            .collect()
    }

    /// Move parameters back out of `graph`, gradients included.
    pub fn reclaim(&mut self, graph: &mut Graph, ids: &[NodeId]) {
        for (p, &id) in self.params.iter_mut().zip(ids) {
            p.mat = graph.take(id);
        }
    }

    /// Copy values from `other` by name. Every parameter of `self` must exist
    /// in `other` with the same shape; nothing is written unless all match.
    pub fn load_values(&mut self, other: &Net) -> Result<()> {
        for p in &self.params {
            let stored = other.get(&p.name).ok_or_else(|| {
                ReinforceError::invalid_parameter(p.name.clone(), "missing from stored model".to_string())
            })?;
            if stored.shape() != p.mat.shape() {
                return Err(ReinforceError::shape_mismatch(p.name.clone(), p.mat.shape(), stored.shape()));
            }
        }
        for p in &mut self.params {
            if let Some(stored) = other.get(&p.name) {
                p.mat.values.assign(&stored.values);
                p.mat.zero_grad();
            }
        }
        Ok(())
    }

    /// Stack every gradient into one column vector, in parameter order.
    pub fn flatten_gradients(&self) -> Mat {
        let grads: Vec<f64> = self
            .params
            .iter()
            .flat_map(|p| p.mat.gradients.iter().copied())
            .collect();
        Mat::column(&grads)
    }
}

impl Serialize for Net {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.params.len()))?;
        for p in &self.params {
            map.serialize_entry(&p.name, &p.mat)?;
        }
        map.end()
    }
}

struct NetVisitor;

impl<'de> Visitor<'de> for NetVisitor {
    type Value = Net;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of parameter name to matrix")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Net, A::Error> {
        let mut net = Net::new();
        while let Some((name, mat)) = map.next_entry::<String, Mat>()? {
            net.push(name, mat).map_err(de::Error::custom)?;
        }
        Ok(net)
    }
}

impl<'de> Deserialize<'de> for Net {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(NetVisitor)
    }
}
