//! The dss module provides [`Dss`], a model of a document security store, i.e., three document-level arrays
//! of CRL, OCSP response and certificate objects plus a per-signature index (VRI) naming the objects each
//! signature relies upon.
//!
//! Objects are not deduplicated across signatures. Storing evidence for two signatures that rely on the
//! same CRL results in two copies of that CRL in the CRL array. Storing evidence again for a signature key
//! first removes the objects stored for that key, so re-processing a signature does not grow the store.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::util::error::*;
use crate::ValidationBundle;

/// An object stored in one of the document-level arrays of a [`Dss`]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct DssObject {
    /// Identifier unique within the store
    pub id: u64,
    /// DER-encoded CRL, OCSPResponse or certificate
    pub bytes: Vec<u8>,
}

/// Identifiers of the objects a signature relies upon
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct VriEntry {
    /// Identifiers of objects in the CRL array
    pub crl_ids: Vec<u64>,
    /// Identifiers of objects in the OCSP array
    pub ocsp_ids: Vec<u64>,
    /// Identifiers of objects in the certificate array
    pub cert_ids: Vec<u64>,
}

impl VriEntry {
    fn ids(&self) -> BTreeSet<u64> {
        self.crl_ids
            .iter()
            .chain(self.ocsp_ids.iter())
            .chain(self.cert_ids.iter())
            .copied()
            .collect()
    }
}

/// [`Dss`] is the document-level evidence store
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Dss {
    /// CRL objects
    pub crls: Vec<DssObject>,
    /// OCSP response objects
    pub ocsps: Vec<DssObject>,
    /// Certificate objects
    pub certs: Vec<DssObject>,
    /// Per-signature index, keyed by signature key
    pub vri: BTreeMap<String, VriEntry>,
    next_id: u64,
}

impl Dss {
    /// Creates a new empty [`Dss`]
    pub fn new() -> Self {
        Self::default()
    }

    fn append(next_id: &mut u64, list: &mut Vec<DssObject>, items: &[Vec<u8>]) -> Vec<u64> {
        let mut ids = Vec::new();
        for bytes in items {
            let id = *next_id;
            *next_id += 1;
            list.push(DssObject {
                id,
                bytes: bytes.clone(),
            });
            ids.push(id);
        }
        ids
    }

    /// `store` replaces the evidence stored under `key` with the contents of `bundle`.
    pub fn store(&mut self, key: &str, bundle: &ValidationBundle) {
        if let Some(old) = self.vri.remove(key) {
            let ids = old.ids();
            debug!("Removing {} object(s) previously stored for {}", ids.len(), key);
            self.crls.retain(|o| !ids.contains(&o.id));
            self.ocsps.retain(|o| !ids.contains(&o.id));
            self.certs.retain(|o| !ids.contains(&o.id));
        }

        let entry = VriEntry {
            crl_ids: Self::append(&mut self.next_id, &mut self.crls, &bundle.crls),
            ocsp_ids: Self::append(&mut self.next_id, &mut self.ocsps, &bundle.ocsps),
            cert_ids: Self::append(&mut self.next_id, &mut self.certs, &bundle.certs),
        };
        self.vri.insert(key.to_string(), entry);
    }

    /// Returns the index entry for a signature key
    pub fn vri(&self, key: &str) -> Option<&VriEntry> {
        self.vri.get(key)
    }

    /// Returns the object with the given identifier from any of the three arrays
    pub fn object(&self, id: u64) -> Option<&DssObject> {
        self.crls
            .iter()
            .chain(self.ocsps.iter())
            .chain(self.certs.iter())
            .find(|o| o.id == id)
    }

    /// Returns the evidence stored for a signature key as a [`ValidationBundle`]
    pub fn bundle_for(&self, key: &str) -> Option<ValidationBundle> {
        let entry = self.vri.get(key)?;
        let collect = |ids: &[u64]| -> Vec<Vec<u8>> {
            ids.iter()
                .filter_map(|id| self.object(*id).map(|o| o.bytes.clone()))
                .collect()
        };
        Some(ValidationBundle {
            crls: collect(&entry.crl_ids),
            ocsps: collect(&entry.ocsp_ids),
            certs: collect(&entry.cert_ids),
        })
    }

    /// Returns the total number of objects across the three arrays
    pub fn object_count(&self) -> usize {
        self.crls.len() + self.ocsps.len() + self.certs.len()
    }

    /// Serializes the store as JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|_e| Error::ParseError)
    }

    /// Deserializes a store from JSON
    pub fn from_json(json: &[u8]) -> Result<Self> {
        serde_json::from_slice(json).map_err(|_e| Error::ParseError)
    }
}

#[test]
fn dss_store_replaces_test() {
    let mut vb = ValidationBundle::new();
    vb.add_crl(&[1]);
    vb.add_ocsp(&[2]);

    let mut dss = Dss::new();
    dss.store("AA", &vb);
    dss.store("AA", &vb);
    assert_eq!(2, dss.object_count());
    assert_eq!(Some(vb.clone()), dss.bundle_for("AA"));

    // same CRL for a second signature is stored again
    dss.store("BB", &vb);
    assert_eq!(2, dss.crls.len());
    assert_eq!(4, dss.object_count());

    let json = dss.to_json().unwrap();
    assert_eq!(dss, Dss::from_json(&json).unwrap());
}
