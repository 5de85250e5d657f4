//! # Client Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use super::{Page, paginate};
use crate::cursor::CursorData;
use crate::error::RepositoryError;
use crate::models::invoice;
use crate::models::client::{self, ActiveModel as ClientActiveModel, Entity as Client, Model as ClientModel};
use crate::requests::{ClientRequest, clean};

/// Repository for Client database operations
pub struct ClientRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ClientRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ClientModel>, RepositoryError> {
        Client::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Lists clients, restricted to one owner when `owner` is set.
    pub async fn list(
        &self,
        owner: Option<Uuid>,
        limit: u64,
        cursor: Option<CursorData>,
    ) -> Result<Page<ClientModel>, RepositoryError> {
        let mut query = Client::find();
        if let Some(owner) = owner {
            query = query.filter(client::Column::UserId.eq(owner));
        }
        paginate(
            self.db,
            query,
            (client::Column::CreatedAt, client::Column::Id),
            limit,
            cursor,
        )
        .await
    }

    pub async fn create(
        &self,
        owner: Uuid,
        request: &ClientRequest,
    ) -> Result<ClientModel, RepositoryError> {
        let now = Utc::now();
        let mut active = ClientActiveModel {
            id: Set(Uuid::new_v4()),
            created_at: Set(now.into()),
            ..Default::default()
        };
        apply(&mut active, owner, request)?;
        active.updated_at = Set(now.into());

        active
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        client: ClientModel,
        owner: Uuid,
        request: &ClientRequest,
    ) -> Result<ClientModel, RepositoryError> {
        let mut active = client.into_active_model();
        apply(&mut active, owner, request)?;
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes the client. Invoices referencing it keep the party inline:
    /// its name and address are copied over and the reference is cleared.
    pub async fn delete(&self, client: ClientModel) -> Result<(), RepositoryError> {
        let txn = self.db.begin().await.map_err(RepositoryError::database_error)?;

        invoice::Entity::update_many()
            .col_expr(invoice::Column::ClientName, Expr::value(client.name.clone()))
            .col_expr(invoice::Column::ClientAddress, Expr::value(client.postal_address()))
            .col_expr(invoice::Column::ClientId, Expr::value(Option::<Uuid>::None))
            .filter(invoice::Column::ClientId.eq(client.id))
            .exec(&txn)
            .await
            .map_err(RepositoryError::database_error)?;

        client
            .delete(&txn)
            .await
            .map_err(RepositoryError::database_error)?;
        txn.commit().await.map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

fn apply(
    active: &mut ClientActiveModel,
    owner: Uuid,
    request: &ClientRequest,
) -> Result<(), RepositoryError> {
    let party = &request.party;
    let name = clean(&party.name).ok_or_else(|| RepositoryError::validation_error("name is required"))?;

    active.user_id = Set(owner);
    active.name = Set(name);
    active.street = Set(clean(&party.street));
    active.city = Set(clean(&party.city));
    active.zip = Set(clean(&party.zip));
    active.country = Set(clean(&party.country));
    active.company_id = Set(clean(&party.company_id));
    active.vat_id = Set(clean(&party.vat_id));
    active.email = Set(clean(&party.email));
    active.phone = Set(clean(&party.phone));
    Ok(())
}
