use serde::{Deserialize, Serialize};
use studio_store::{KeyValueStore, WriteBatch};
use tracing::{debug, info};

use crate::codec::EntityCodec;
use crate::config::EngineConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::locks::KeyLocks;
use crate::records::{Material, Owner, Shortfall, Wand, WAND_MATERIAL_COUNT};
use crate::validation::{parse_quantity, validate_description, validate_owner_id};

/// Outcome of a successful material transfer: both owners as committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub description: String,
    pub quantity: u64,
    pub sender: Owner,
    pub receiver: Owner,
}

/// State-transition engine over an injected key-value store.
///
/// Each owner aggregate lives under its id as a single record; materials and
/// wands are never stored under keys of their own. Every operation:
///
/// 1. validates its string arguments,
/// 2. locks the owner keys it touches,
/// 3. re-reads current state from the store (nothing is cached),
/// 4. checks business rules on the in-memory copy,
/// 5. commits all changed owners in one atomic [`WriteBatch`].
///
/// Validation failures are raised before anything is written, so a failed
/// operation never leaves a partial update behind.
pub struct LedgerEngine<S> {
    store: S,
    locks: KeyLocks,
}

impl<S: KeyValueStore> LedgerEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            locks: KeyLocks::new(config.lock_stripes),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create an owner with empty material and wand lists.
    pub fn register_owner(&self, owner_id: &str) -> LedgerResult<Owner> {
        validate_owner_id(owner_id)?;
        let _guard = self.locks.lock(&[owner_id]);

        if self.store.contains(owner_id)? {
            return Err(LedgerError::AlreadyExists {
                owner: owner_id.to_string(),
            });
        }

        let owner = Owner::new(owner_id);
        self.commit(&[&owner])?;
        info!(owner = owner_id, "owner registered");
        Ok(owner)
    }

    /// Append a new material line to an owner.
    ///
    /// Lines are never merged here: registering a description the owner
    /// already holds adds a second line.
    pub fn register_material(
        &self,
        description: &str,
        quantity: &str,
        owner_id: &str,
    ) -> LedgerResult<Material> {
        validate_description(description)?;
        let quantity = parse_quantity(quantity)?;
        validate_owner_id(owner_id)?;
        let _guard = self.locks.lock(&[owner_id]);

        let mut owner = self.load_owner(owner_id)?;
        let material = Material::new(description, quantity, owner_id);
        owner.materials.push(material.clone());
        self.commit(&[&owner])?;

        debug!(owner = owner_id, description, quantity, "material registered");
        Ok(material)
    }

    /// Move `quantity` of `description` from one owner to another.
    ///
    /// The amount is taken from the sender's first line for the description;
    /// if that line is too small the transfer fails even when a later line
    /// could cover it. It is added to the receiver's first line for the
    /// description (or a new line). Both owners are written in one batch.
    pub fn transfer_material(
        &self,
        sender_id: &str,
        description: &str,
        quantity: &str,
        receiver_id: &str,
    ) -> LedgerResult<TransferReceipt> {
        validate_owner_id(sender_id)?;
        validate_description(description)?;
        let quantity = parse_quantity(quantity)?;
        validate_owner_id(receiver_id)?;
        if sender_id == receiver_id {
            return Err(LedgerError::InvalidArgument(format!(
                "sender and receiver are both {sender_id:?}"
            )));
        }
        let _guard = self.locks.lock(&[sender_id, receiver_id]);

        let mut sender = self.load_owner(sender_id)?;
        let mut receiver = self.load_owner(receiver_id)?;

        sender
            .withdraw(description, quantity)
            .map_err(|shortfall| match shortfall {
                Shortfall::Missing => LedgerError::MaterialNotFound {
                    owner: sender_id.to_string(),
                    description: description.to_string(),
                },
                Shortfall::Insufficient { available } => LedgerError::InsufficientQuantity {
                    owner: sender_id.to_string(),
                    description: description.to_string(),
                    requested: quantity,
                    available,
                },
            })?;
        receiver.deposit(description, quantity).ok_or_else(|| {
            LedgerError::InvalidArgument(format!(
                "receiving {quantity} of {description:?} would overflow {receiver_id}'s holding"
            ))
        })?;

        self.commit(&[&sender, &receiver])?;

        debug!(
            sender = sender_id,
            receiver = receiver_id,
            description,
            quantity,
            "material transferred"
        );
        Ok(TransferReceipt {
            description: description.to_string(),
            quantity,
            sender,
            receiver,
        })
    }

    /// Craft a wand from the owner's first two material lines.
    pub fn craft_wand(&self, owner_id: &str) -> LedgerResult<Wand> {
        validate_owner_id(owner_id)?;
        let _guard = self.locks.lock(&[owner_id]);

        let mut owner = self.load_owner(owner_id)?;
        let wand = owner
            .craft_wand()
            .map_err(|available| LedgerError::InsufficientMaterials {
                owner: owner_id.to_string(),
                available,
                required: WAND_MATERIAL_COUNT,
            })?
            .clone();
        self.commit(&[&owner])?;

        info!(owner = owner_id, wands = owner.wands.len(), "wand crafted");
        Ok(wand)
    }

    /// Every material line of every owner, in store scan order.
    pub fn list_materials(&self) -> LedgerResult<Vec<Material>> {
        Ok(self
            .owners()?
            .into_iter()
            .flat_map(|owner| owner.materials)
            .collect())
    }

    /// Every wand of every owner, in store scan order.
    pub fn list_wands(&self) -> LedgerResult<Vec<Wand>> {
        Ok(self
            .owners()?
            .into_iter()
            .flat_map(|owner| owner.wands)
            .collect())
    }

    /// Fetch one owner aggregate.
    pub fn get_owner(&self, owner_id: &str) -> LedgerResult<Owner> {
        validate_owner_id(owner_id)?;
        self.load_owner(owner_id)
    }

    /// Every owner aggregate, in store scan order.
    pub fn owners(&self) -> LedgerResult<Vec<Owner>> {
        self.store
            .scan_all()?
            .into_iter()
            .map(|(key, bytes)| EntityCodec::decode_owner(&key, &bytes))
            .collect()
    }

    fn load_owner(&self, owner_id: &str) -> LedgerResult<Owner> {
        let bytes = self
            .store
            .get(owner_id)?
            .ok_or_else(|| LedgerError::owner_not_found(owner_id))?;
        EntityCodec::decode_owner(owner_id, &bytes)
    }

    fn commit(&self, owners: &[&Owner]) -> LedgerResult<()> {
        let mut batch = WriteBatch::new();
        for owner in owners {
            debug_assert!(
                owner.check_consistency().is_ok(),
                "owner {} fails consistency before commit",
                owner.id
            );
            batch.put(owner.id.clone(), EntityCodec::encode(*owner)?);
        }
        self.store.write(batch)?;
        Ok(())
    }
}

impl<S> std::fmt::Debug for LedgerEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEngine")
            .field("locks", &self.locks)
            .finish_non_exhaustive()
    }
}
