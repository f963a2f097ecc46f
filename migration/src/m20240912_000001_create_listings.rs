use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string_uniq(Movies::Name))
                    .col(string(Movies::MachineName))
                    .col(integer(Movies::Duration))
                    .col(string(Movies::Classification))
                    .col(string(Movies::Poster))
                    .col(string(Movies::LastUpdated))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movies_last_updated")
                    .table(Movies::Table)
                    .col(Movies::LastUpdated)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Showtimes::Table)
                    .if_not_exists()
                    .col(pk_auto(Showtimes::Id))
                    .col(integer(Showtimes::MovieId))
                    .col(string(Showtimes::Date))
                    .col(string(Showtimes::Datetime))
                    .col(string(Showtimes::Format))
                    .col(string(Showtimes::Language))
                    .col(string(Showtimes::Hall))
                    .col(string(Showtimes::PerformanceId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_showtimes_movie")
                            .from(Showtimes::Table, Showtimes::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_showtimes_unique")
                    .table(Showtimes::Table)
                    .col(Showtimes::MovieId)
                    .col(Showtimes::Date)
                    .col(Showtimes::PerformanceId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_showtimes_date")
                    .table(Showtimes::Table)
                    .col(Showtimes::Date)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Showtimes::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Movies {
    Table,
    Id,
    Name,
    MachineName,
    Duration,
    Classification,
    Poster,
    LastUpdated,
}

#[derive(DeriveIden)]
enum Showtimes {
    Table,
    Id,
    MovieId,
    Date,
    Datetime,
    Format,
    Language,
    Hall,
    PerformanceId,
}
