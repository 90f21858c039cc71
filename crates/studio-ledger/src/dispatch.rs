//! Named-function routing over a [`LedgerEngine`].
//!
//! Callers that only have a function name and positional string arguments
//! (a shell, an RPC shim) go through [`Invocation::parse`] and
//! [`Dispatcher::invoke`], which answer with a JSON payload.

use serde::Serialize;
use serde_json::Value;
use studio_store::KeyValueStore;
use tracing::debug;

use crate::engine::LedgerEngine;
use crate::error::{LedgerError, LedgerResult};

/// A parsed call to one ledger operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    RegisterOwner {
        owner: String,
    },
    RegisterMaterial {
        description: String,
        quantity: String,
        owner: String,
    },
    TransferMaterial {
        sender: String,
        description: String,
        quantity: String,
        receiver: String,
    },
    CraftWand {
        owner: String,
    },
    ListMaterials,
    ListWands,
    GetOwner {
        owner: String,
    },
}

/// Every function name [`Invocation::parse`] accepts.
pub const FUNCTIONS: [&str; 7] = [
    "RegisterOwner",
    "RegisterMaterial",
    "TransferMaterial",
    "CraftWand",
    "ListMaterials",
    "ListWands",
    "GetOwner",
];

impl Invocation {
    /// Build an invocation from a function name and its positional arguments.
    pub fn parse(function: &str, args: &[String]) -> LedgerResult<Self> {
        let arity = match function {
            "RegisterOwner" | "CraftWand" | "GetOwner" => 1,
            "RegisterMaterial" => 3,
            "TransferMaterial" => 4,
            "ListMaterials" | "ListWands" => 0,
            other => {
                return Err(LedgerError::InvalidArgument(format!(
                    "unknown function {other:?}; expected one of {}",
                    FUNCTIONS.join(", ")
                )))
            }
        };
        if args.len() != arity {
            return Err(LedgerError::InvalidArgument(format!(
                "{function} takes {arity} argument(s), got {}",
                args.len()
            )));
        }

        let arg = |i: usize| args[i].clone();
        Ok(match function {
            "RegisterOwner" => Self::RegisterOwner { owner: arg(0) },
            "RegisterMaterial" => Self::RegisterMaterial {
                description: arg(0),
                quantity: arg(1),
                owner: arg(2),
            },
            "TransferMaterial" => Self::TransferMaterial {
                sender: arg(0),
                description: arg(1),
                quantity: arg(2),
                receiver: arg(3),
            },
            "CraftWand" => Self::CraftWand { owner: arg(0) },
            "ListMaterials" => Self::ListMaterials,
            "ListWands" => Self::ListWands,
            _ => Self::GetOwner { owner: arg(0) },
        })
    }

    /// Function name of this invocation.
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::RegisterOwner { .. } => "RegisterOwner",
            Self::RegisterMaterial { .. } => "RegisterMaterial",
            Self::TransferMaterial { .. } => "TransferMaterial",
            Self::CraftWand { .. } => "CraftWand",
            Self::ListMaterials => "ListMaterials",
            Self::ListWands => "ListWands",
            Self::GetOwner { .. } => "GetOwner",
        }
    }

    /// Whether running this invocation can change ledger state.
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::ListMaterials | Self::ListWands | Self::GetOwner { .. }
        )
    }
}

/// Runs invocations against an engine.
pub struct Dispatcher<'a, S> {
    engine: &'a LedgerEngine<S>,
}

impl<'a, S: KeyValueStore> Dispatcher<'a, S> {
    pub fn new(engine: &'a LedgerEngine<S>) -> Self {
        Self { engine }
    }

    /// Parse and run in one step.
    pub fn call(&self, function: &str, args: &[String]) -> LedgerResult<Value> {
        self.invoke(Invocation::parse(function, args)?)
    }

    /// Run an invocation and render its result as JSON.
    pub fn invoke(&self, invocation: Invocation) -> LedgerResult<Value> {
        debug!(function = invocation.function_name(), "dispatching");
        let engine = self.engine;
        match invocation {
            Invocation::RegisterOwner { owner } => to_payload(&engine.register_owner(&owner)?),
            Invocation::RegisterMaterial {
                description,
                quantity,
                owner,
            } => to_payload(&engine.register_material(&description, &quantity, &owner)?),
            Invocation::TransferMaterial {
                sender,
                description,
                quantity,
                receiver,
            } => to_payload(&engine.transfer_material(&sender, &description, &quantity, &receiver)?),
            Invocation::CraftWand { owner } => to_payload(&engine.craft_wand(&owner)?),
            Invocation::ListMaterials => to_payload(&engine.list_materials()?),
            Invocation::ListWands => to_payload(&engine.list_wands()?),
            Invocation::GetOwner { owner } => to_payload(&engine.get_owner(&owner)?),
        }
    }
}

fn to_payload<T: Serialize>(value: &T) -> LedgerResult<Value> {
    serde_json::to_value(value).map_err(|e| LedgerError::CorruptState {
        key: String::new(),
        reason: format!("failed to render result: {e}"),
    })
}
