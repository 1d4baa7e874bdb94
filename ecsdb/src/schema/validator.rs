use super::types::*;
use crate::error::Result;

pub struct SchemaValidator;

impl SchemaValidator {
    pub fn validate(&self, _schema: &DatabaseSchema) -> Result<()> {
        // TODO: implement validation
        Ok(())
    }

    pub fn check_foreign_keys(&self, _schema: &DatabaseSchema) -> Result<()> {
        // TODO: implement foreign key validation
        Ok(())
    }

    pub fn check_field_alignment(&self, _schema: &DatabaseSchema) -> Result<()> {
        // TODO: implement alignment validation
        Ok(())
    }

    pub fn check_reserved_names(&self, _schema: &DatabaseSchema) -> Result<()> {
        // TODO: implement reserved names validation
        Ok(())
    }
}
