use sea_orm::{DatabaseTransaction, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, checks, clients, invoices, sales, suppliers};

use super::Engine;

/// Generates a `require_*` lookup that loads an entity by id inside the
/// current transaction or fails with `NotFound`.
macro_rules! impl_require_by_id {
    ($fn_name:ident, $entity:path, $model:ty, $err_msg:literal) => {
        pub(super) async fn $fn_name(
            &self,
            db: &DatabaseTransaction,
            id: Uuid,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::NotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_require_by_id!(
        require_client,
        clients::Entity,
        clients::Model,
        "client not exists"
    );

    impl_require_by_id!(
        require_supplier,
        suppliers::Entity,
        suppliers::Model,
        "supplier not exists"
    );

    impl_require_by_id!(require_sale, sales::Entity, sales::Model, "sale not exists");

    impl_require_by_id!(
        require_invoice,
        invoices::Entity,
        invoices::Model,
        "invoice not exists"
    );

    impl_require_by_id!(
        require_check,
        checks::Entity,
        checks::Model,
        "check not exists"
    );
}
