//! JSON document codec for ledger records.
//!
//! Every top-level document carries a `docType` tag naming the record type:
//!
//! ```text
//! {"docType":"owner","id":"A","materials":[...],"wands":[...]}
//! ```
//!
//! Records nested inside an owner are plain objects without a tag. Decoding
//! is strict: malformed JSON, a wrong or missing tag, missing fields, and
//! records that break the owner consistency rules all surface as
//! [`LedgerError::CorruptState`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{Material, Owner, Wand};

/// Tag stored in the `docType` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Owner,
    Material,
    Wand,
}

/// A record type the codec can store.
pub trait Record: Serialize + DeserializeOwned {
    const DOC_TYPE: DocType;

    /// Id of the owner this record belongs to.
    fn owner_id(&self) -> &str;

    /// Structural checks applied after decoding.
    fn validate(&self) -> Result<(), String>;
}

impl Record for Owner {
    const DOC_TYPE: DocType = DocType::Owner;

    fn owner_id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        self.check_consistency()
    }
}

impl Record for Material {
    const DOC_TYPE: DocType = DocType::Material;

    fn owner_id(&self) -> &str {
        &self.owner
    }

    fn validate(&self) -> Result<(), String> {
        if self.owner.is_empty() {
            return Err("material owner is empty".into());
        }
        if self.description.is_empty() {
            return Err("material description is empty".into());
        }
        Ok(())
    }
}

impl Record for Wand {
    const DOC_TYPE: DocType = DocType::Wand;

    fn owner_id(&self) -> &str {
        &self.owner
    }

    fn validate(&self) -> Result<(), String> {
        if self.owner.is_empty() {
            return Err("wand owner is empty".into());
        }
        if self.quantity == 0 {
            return Err("wand quantity is zero".into());
        }
        for material in &self.materials {
            material.validate()?;
            if material.owner != self.owner {
                return Err(format!(
                    "wand material {:?} names owner {:?}, expected {:?}",
                    material.description, material.owner, self.owner
                ));
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, R> {
    #[serde(rename = "docType")]
    doc_type: DocType,
    #[serde(flatten)]
    record: &'a R,
}

#[derive(Deserialize)]
#[serde(bound = "R: DeserializeOwned")]
struct Envelope<R> {
    #[serde(rename = "docType")]
    doc_type: DocType,
    #[serde(flatten)]
    record: R,
}

/// Encodes and decodes ledger records to and from store values.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityCodec;

impl EntityCodec {
    /// Encode a record as a tagged JSON document.
    ///
    /// Encoding is deterministic: the same record always yields the same
    /// bytes.
    pub fn encode<R: Record>(record: &R) -> LedgerResult<Vec<u8>> {
        let envelope = EnvelopeRef {
            doc_type: R::DOC_TYPE,
            record,
        };
        serde_json::to_vec(&envelope).map_err(|e| LedgerError::CorruptState {
            key: record.owner_id().to_string(),
            reason: format!("failed to encode {:?} document: {e}", R::DOC_TYPE),
        })
    }

    /// Decode a tagged document read from `key`.
    pub fn decode<R: Record>(key: &str, bytes: &[u8]) -> LedgerResult<R> {
        let corrupt = |reason: String| LedgerError::CorruptState {
            key: key.to_string(),
            reason,
        };

        let envelope: Envelope<R> = serde_json::from_slice(bytes)
            .map_err(|e| corrupt(format!("malformed {:?} document: {e}", R::DOC_TYPE)))?;
        if envelope.doc_type != R::DOC_TYPE {
            return Err(corrupt(format!(
                "expected {:?} document, found {:?}",
                R::DOC_TYPE,
                envelope.doc_type
            )));
        }
        envelope.record.validate().map_err(corrupt)?;
        Ok(envelope.record)
    }

    /// Decode the owner aggregate stored under `key`, which must match its id.
    pub fn decode_owner(key: &str, bytes: &[u8]) -> LedgerResult<Owner> {
        let owner: Owner = Self::decode(key, bytes)?;
        if owner.id != key {
            return Err(LedgerError::CorruptState {
                key: key.to_string(),
                reason: format!("record holds owner {:?}", owner.id),
            });
        }
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn sample_owner() -> Owner {
        let mut owner = Owner::new("Ezequiel");
        owner.materials.push(Material::new("Cabos de ébano", 100, "Ezequiel"));
        owner.wands.push(Wand {
            materials: vec![
                Material::new("Rubis", 50, "Ezequiel"),
                Material::new("Sangue de Dragão", 10, "Ezequiel"),
            ],
            quantity: 1,
            owner: "Ezequiel".into(),
        });
        owner
    }

    fn corrupt_reason(result: LedgerResult<Owner>) -> String {
        match result {
            Err(LedgerError::CorruptState { reason, .. }) => reason,
            other => panic!("expected CorruptState, got {other:?}"),
        }
    }

    #[test]
    fn owner_document_is_tagged() {
        let bytes = EntityCodec::encode(&Owner::new("A")).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            r#"{"docType":"owner","id":"A","materials":[],"wands":[]}"#
        );
    }

    #[test]
    fn owner_roundtrip_with_nested_records() {
        let owner = sample_owner();
        let bytes = EntityCodec::encode(&owner).unwrap();
        assert_eq!(EntityCodec::decode_owner("Ezequiel", &bytes).unwrap(), owner);
    }

    #[test]
    fn material_and_wand_roundtrip() {
        let material = Material::new("Rubis", 50, "A");
        let bytes = EntityCodec::encode(&material).unwrap();
        assert_eq!(EntityCodec::decode::<Material>("A", &bytes).unwrap(), material);

        let wand = sample_owner().wands.remove(0);
        let bytes = EntityCodec::encode(&wand).unwrap();
        assert_eq!(EntityCodec::decode::<Wand>("Ezequiel", &bytes).unwrap(), wand);
    }

    #[test]
    fn encoding_is_deterministic() {
        let owner = sample_owner();
        assert_eq!(
            EntityCodec::encode(&owner).unwrap(),
            EntityCodec::encode(&owner.clone()).unwrap()
        );
    }

    #[test]
    fn rejects_malformed_json() {
        let reason = corrupt_reason(EntityCodec::decode_owner("A", b"{not json"));
        assert!(reason.contains("malformed"));
    }

    #[test]
    fn rejects_wrong_doc_type() {
        let bytes = EntityCodec::encode(&Material::new("Rubis", 1, "A")).unwrap();
        let result = EntityCodec::decode::<Owner>("A", &bytes);
        assert_eq!(result.unwrap_err().kind(), ErrorKind::CorruptState);
    }

    #[test]
    fn rejects_missing_doc_type() {
        let reason = corrupt_reason(EntityCodec::decode_owner(
            "A",
            br#"{"id":"A","materials":[],"wands":[]}"#,
        ));
        assert!(reason.contains("docType"));
    }

    #[test]
    fn rejects_missing_fields() {
        let reason = corrupt_reason(EntityCodec::decode_owner(
            "A",
            br#"{"docType":"owner","id":"A","materials":[]}"#,
        ));
        assert!(reason.contains("wands"));
    }

    #[test]
    fn rejects_negative_quantity() {
        let bytes = br#"{"docType":"owner","id":"A","materials":[{"description":"Cabo","quantity":-1,"owner":"A"}],"wands":[]}"#;
        assert!(EntityCodec::decode_owner("A", bytes).is_err());
    }

    #[test]
    fn rejects_foreign_material() {
        let bytes = br#"{"docType":"owner","id":"A","materials":[{"description":"Cabo","quantity":1,"owner":"B"}],"wands":[]}"#;
        let reason = corrupt_reason(EntityCodec::decode_owner("A", bytes));
        assert!(reason.contains("material #0"));
    }

    #[test]
    fn rejects_key_mismatch() {
        let bytes = EntityCodec::encode(&Owner::new("A")).unwrap();
        let reason = corrupt_reason(EntityCodec::decode_owner("B", &bytes));
        assert!(reason.contains("\"A\""));
    }

    fn arb_material(owner: &'static str) -> impl Strategy<Value = Material> {
        ("[a-zA-Zà-ú ]{1,12}", any::<u64>())
            .prop_map(move |(description, quantity)| Material::new(description, quantity, owner))
    }

    fn arb_owner() -> impl Strategy<Value = Owner> {
        let wand = (prop::collection::vec(arb_material("X"), 0..4), 1..5u64).prop_map(
            |(materials, quantity)| Wand {
                materials,
                quantity,
                owner: "X".into(),
            },
        );
        (
            prop::collection::vec(arb_material("X"), 0..8),
            prop::collection::vec(wand, 0..4),
        )
            .prop_map(|(materials, wands)| Owner {
                id: "X".into(),
                materials,
                wands,
            })
    }

    proptest! {
        #[test]
        fn owner_roundtrip_holds_for_any_owner(owner in arb_owner()) {
            let bytes = EntityCodec::encode(&owner).unwrap();
            prop_assert_eq!(EntityCodec::decode_owner("X", &bytes).unwrap(), owner);
        }
    }
}
