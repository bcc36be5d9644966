use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_supplements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub dish_id: Uuid,
    pub supplement_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::DishId",
        to = "super::products::Column::Id"
    )]
    Dish,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::SupplementId",
        to = "super::products::Column::Id"
    )]
    Supplement,
}

impl ActiveModelBehavior for ActiveModel {}
