//! Basket registry and definitions.
//!
//! The registry plays the controller role: it decides which baskets are
//! valid. Each [`BasketDefinition`] lists its components in order and any
//! externally-managed position modules attached to a component.

use std::collections::{HashMap, HashSet};

use issuance_types::{Address, Component, IssuanceError, Result};
use serde::{Deserialize, Serialize};

/// A multi-component basket token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketDefinition {
    pub address: Address,
    pub symbol: String,
    /// Components in the order the basket reports them.
    pub components: Vec<Component>,
    /// Component → attached external position modules.
    pub external_positions: HashMap<Address, Vec<Address>>,
}

impl BasketDefinition {
    /// Unit of `asset` per basket unit, if it is a component.
    #[must_use]
    pub fn unit(&self, asset: Address) -> Option<rust_decimal::Decimal> {
        self.components
            .iter()
            .find(|c| c.asset == asset)
            .map(|c| c.unit)
    }

    /// External position modules attached to `component` (empty if none).
    #[must_use]
    pub fn external_position_modules(&self, component: Address) -> &[Address] {
        self.external_positions
            .get(&component)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// All known baskets plus the set of registered ones.
#[derive(Debug, Clone)]
pub struct BasketRegistry {
    /// Address of the issuance module that pulls components on issue.
    module: Address,
    definitions: HashMap<Address, BasketDefinition>,
    registered: HashSet<Address>,
}

impl BasketRegistry {
    #[must_use]
    pub fn new(module: Address) -> Self {
        Self {
            module,
            definitions: HashMap::new(),
            registered: HashSet::new(),
        }
    }

    /// The issuance module's address.
    #[must_use]
    pub fn module(&self) -> Address {
        self.module
    }

    /// Store a definition without registering it.
    ///
    /// # Errors
    /// Returns `Configuration` for an empty component list, a non-positive
    /// unit, a native or duplicate component, or a duplicate basket.
    pub fn define(&mut self, definition: BasketDefinition) -> Result<()> {
        if definition.components.is_empty() {
            return Err(IssuanceError::Configuration(format!(
                "basket {} has no components",
                definition.symbol
            )));
        }
        for (i, c) in definition.components.iter().enumerate() {
            if c.unit <= rust_decimal::Decimal::ZERO {
                return Err(IssuanceError::Configuration(format!(
                    "basket {} component {} has non-positive unit {}",
                    definition.symbol, c.asset, c.unit
                )));
            }
            if c.asset.is_native() {
                return Err(IssuanceError::Configuration(format!(
                    "basket {} cannot hold native currency directly",
                    definition.symbol
                )));
            }
            if definition.components[..i].iter().any(|p| p.asset == c.asset) {
                return Err(IssuanceError::Configuration(format!(
                    "basket {} lists component {} twice",
                    definition.symbol, c.asset
                )));
            }
        }
        if self.definitions.contains_key(&definition.address) {
            return Err(IssuanceError::Configuration(format!(
                "basket {} already defined",
                definition.address
            )));
        }
        self.definitions.insert(definition.address, definition);
        Ok(())
    }

    /// Mark a defined basket as valid.
    pub fn add_set(&mut self, basket: Address) -> Result<()> {
        if !self.definitions.contains_key(&basket) {
            return Err(IssuanceError::InvalidSet(basket));
        }
        self.registered.insert(basket);
        Ok(())
    }

    /// Remove a basket from the registry. Its definition is kept.
    pub fn remove_set(&mut self, basket: Address) {
        self.registered.remove(&basket);
    }

    /// Registry membership query.
    #[must_use]
    pub fn is_set(&self, basket: Address) -> bool {
        self.registered.contains(&basket)
    }

    #[must_use]
    pub fn get(&self, basket: Address) -> Option<&BasketDefinition> {
        self.definitions.get(&basket)
    }

    /// Definition of a basket, failing with `INVALID_SET` if unknown.
    pub fn definition(&self, basket: Address) -> Result<&BasketDefinition> {
        self.definitions
            .get(&basket)
            .ok_or(IssuanceError::InvalidSet(basket))
    }

    /// Attach an externally-managed position module to a component.
    ///
    /// # Errors
    /// - `InvalidSet` if the basket is unknown
    /// - `InvalidInputs` if `component` is not part of the basket
    pub fn add_external_position(
        &mut self,
        basket: Address,
        component: Address,
        module: Address,
    ) -> Result<()> {
        let def = self
            .definitions
            .get_mut(&basket)
            .ok_or(IssuanceError::InvalidSet(basket))?;
        if def.unit(component).is_none() {
            return Err(IssuanceError::InvalidInputs {
                reason: format!("{component} is not a component of {basket}"),
            });
        }
        def.external_positions
            .entry(component)
            .or_default()
            .push(module);
        Ok(())
    }
}
