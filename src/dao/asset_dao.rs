//! Asset DAO
//!
//! Assets, their environment-scoped security properties, asset types and
//! asset values.

use tracing::info;

use super::{CairisDao, EntityDao, ObjectRef};
use crate::db::{Dimension, ProxyError};
use crate::error::{CairisError, Result};
use crate::model::{
    Asset, AssetEnvironmentProperties, AssetParameters, NamedCollection, ValueType, ValueTypeKind,
    ValueTypeParameters,
};
use crate::session::SessionContext;

pub struct AssetDao {
    base: CairisDao,
}

impl EntityDao for AssetDao {
    type Entity = Asset;
    const LABEL: &'static str = "asset";

    fn base(&self) -> &CairisDao {
        &self.base
    }

    fn fetch(&self, constraint_id: Option<i64>) -> Result<NamedCollection<Asset>, ProxyError> {
        self.base.db().get_assets(constraint_id)
    }
}

impl AssetDao {
    pub fn new(session: SessionContext) -> Self {
        Self {
            base: CairisDao::new(session),
        }
    }

    // =========================================================================
    // Assets
    // =========================================================================

    pub fn get_asset_names(&self) -> Result<Vec<String>> {
        self.base.dimension_names(Dimension::Asset)
    }

    /// Environment properties of one asset, rich form
    pub fn get_asset_props(&self, name: &str) -> Result<Vec<AssetEnvironmentProperties>> {
        Ok(self.get_by_name(name)?.environment_properties)
    }

    pub fn add_asset(&self, asset: &Asset) -> Result<i64> {
        self.base.name_check(&asset.name, Dimension::Asset)?;

        let params = AssetParameters::from_asset(asset);
        let asset_id = self.base.proxy(self.base.db().add_asset(&params))?;

        info!(asset = %asset.name, asset_id, "Asset created");
        Ok(asset_id)
    }

    pub fn update_asset(&self, asset: &Asset, target: &ObjectRef) -> Result<()> {
        let existing = self.resolve(target)?;

        let mut params = AssetParameters::from_asset(asset);
        params.set_id(existing.id);
        self.base.proxy(self.base.db().update_asset(&params))?;

        info!(asset = %asset.name, asset_id = existing.id, "Asset updated");
        Ok(())
    }

    /// Replace only the environment properties, keeping every other field
    pub fn update_asset_properties(&self, props: Vec<AssetEnvironmentProperties>, name: &str) -> Result<()> {
        let existing = self.get_by_name(name)?;

        let mut params = AssetParameters::from_asset(&existing).with_environment_properties(props);
        params.set_id(existing.id);
        self.base.proxy(self.base.db().update_asset(&params))?;

        info!(asset = %name, asset_id = existing.id, "Asset properties updated");
        Ok(())
    }

    pub fn delete_asset(&self, target: &ObjectRef) -> Result<()> {
        let existing = self.resolve(target)?;
        self.base.proxy(self.base.db().delete_asset(existing.id))?;

        info!(asset = %existing.name, asset_id = existing.id, "Asset deleted");
        Ok(())
    }

    // =========================================================================
    // Asset Types
    // =========================================================================

    pub fn get_asset_types(&self, environment_name: &str) -> Result<Vec<ValueType>> {
        self.base
            .proxy(self.base.db().get_value_types(ValueTypeKind::AssetType, environment_name))
    }

    pub fn get_asset_type_by_name(&self, name: &str, environment_name: &str) -> Result<ValueType> {
        self.find_value_type(ValueTypeKind::AssetType, name, environment_name)
    }

    pub fn check_existing_asset_type(&self, name: &str, environment_name: &str) -> Result<bool> {
        self.value_type_exists(ValueTypeKind::AssetType, name, environment_name)
    }

    pub fn add_asset_type(&self, asset_type: &ValueType, environment_name: &str) -> Result<i64> {
        if self.check_existing_asset_type(&asset_type.name, environment_name)? {
            return Err(self.base.fail(CairisError::Conflict(format!(
                "The asset type {} already exists",
                asset_type.name
            ))));
        }

        let params = ValueTypeParameters::new(asset_type, ValueTypeKind::AssetType, environment_name);
        let type_id = self.base.proxy(self.base.db().add_value_type(&params))?;

        info!(asset_type = %asset_type.name, environment = environment_name, type_id, "Asset type created");
        Ok(type_id)
    }

    pub fn update_asset_type(&self, asset_type: &ValueType, name: &str, environment_name: &str) -> Result<()> {
        self.update_value_type(ValueTypeKind::AssetType, asset_type, name, environment_name)
    }

    pub fn delete_asset_type(&self, name: &str, environment_name: &str) -> Result<()> {
        let found = self.get_asset_type_by_name(name, environment_name)?;
        self.base
            .proxy(self.base.db().delete_value_type(found.id, ValueTypeKind::AssetType))?;

        info!(asset_type = %name, environment = environment_name, "Asset type deleted");
        Ok(())
    }

    // =========================================================================
    // Asset Values
    // =========================================================================

    pub fn get_asset_values(&self, environment_name: &str) -> Result<Vec<ValueType>> {
        self.base
            .proxy(self.base.db().get_value_types(ValueTypeKind::AssetValue, environment_name))
    }

    pub fn get_asset_value_by_name(&self, name: &str, environment_name: &str) -> Result<ValueType> {
        self.find_value_type(ValueTypeKind::AssetValue, name, environment_name)
    }

    pub fn check_existing_asset_value(&self, name: &str, environment_name: &str) -> Result<bool> {
        self.value_type_exists(ValueTypeKind::AssetValue, name, environment_name)
    }

    pub fn update_asset_value(&self, asset_value: &ValueType, name: &str, environment_name: &str) -> Result<()> {
        self.update_value_type(ValueTypeKind::AssetValue, asset_value, name, environment_name)
    }

    // =========================================================================
    // Shared value type handling
    // =========================================================================

    fn label(kind: ValueTypeKind) -> &'static str {
        match kind {
            ValueTypeKind::AssetType => "asset type",
            ValueTypeKind::AssetValue => "asset value",
        }
    }

    fn find_value_type(&self, kind: ValueTypeKind, name: &str, environment_name: &str) -> Result<ValueType> {
        let all = self.base.proxy(self.base.db().get_value_types(kind, environment_name))?;

        if all.is_empty() {
            return Err(self.base.fail(CairisError::not_found(match kind {
                ValueTypeKind::AssetType => "Asset types",
                ValueTypeKind::AssetValue => "Asset values",
            })));
        }

        all.into_iter().find(|vt| vt.name == name).ok_or_else(|| {
            self.base.fail(CairisError::not_found(format!("The provided {} name", Self::label(kind))))
        })
    }

    fn value_type_exists(&self, kind: ValueTypeKind, name: &str, environment_name: &str) -> Result<bool> {
        match self.find_value_type(kind, name, environment_name) {
            Ok(_) => Ok(true),
            Err(CairisError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn update_value_type(
        &self,
        kind: ValueTypeKind,
        value_type: &ValueType,
        name: &str,
        environment_name: &str,
    ) -> Result<()> {
        let found = self.find_value_type(kind, name, environment_name)?;

        let mut params = ValueTypeParameters::new(value_type, kind, environment_name);
        params.set_id(found.id);
        self.base.proxy(self.base.db().update_value_type(&params))?;

        info!(kind = %kind, name, environment = environment_name, "Value type updated");
        Ok(())
    }
}
