use std::{collections::HashMap, sync::Arc};

use jiff::civil::Date;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait, sea_query::OnConflict,
};

use crate::{
    clock,
    entities::{movie, showtime},
    models::{Performance, Title},
};

// 8 bound parameters per showtime row keeps each statement well under
// SQLite's variable limit.
const SHOWTIME_CHUNK: usize = 100;

/// Day-scoped listings cache on top of the `movies` / `showtimes` tables.
#[derive(Clone)]
pub struct ListingStore {
    db: Arc<DatabaseConnection>,
}

impl ListingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db: Arc::new(db) }
    }

    #[cfg(test)]
    pub fn db(&self) -> &DatabaseConnection {
        &*self.db
    }

    /// Whether at least one title was refreshed on `date`.
    pub async fn has_listings(&self, date: Date) -> Result<bool, DbErr> {
        let hit = movie::Entity::find()
            .filter(movie::Column::LastUpdated.eq(date.to_string()))
            .one(&*self.db)
            .await?;
        Ok(hit.is_some())
    }

    pub async fn listings_for(&self, date: Date) -> Result<Vec<Title>, DbErr> {
        let day = date.to_string();

        let movies = movie::Entity::find()
            .filter(movie::Column::LastUpdated.eq(day.as_str()))
            .order_by_asc(movie::Column::Name)
            .all(&*self.db)
            .await?;
        if movies.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = movies.iter().map(|m| m.id).collect();
        let rows = showtime::Entity::find()
            .filter(showtime::Column::MovieId.is_in(ids))
            .filter(showtime::Column::Date.eq(day.as_str()))
            .order_by_asc(showtime::Column::Datetime)
            .order_by_asc(showtime::Column::PerformanceId)
            .all(&*self.db)
            .await?;

        let mut by_movie: HashMap<i32, Vec<Performance>> = HashMap::new();
        for row in rows {
            let start = clock::from_storage(&row.datetime)
                .map_err(|e| DbErr::Type(format!("showtime {} datetime: {e}", row.id)))?;
            by_movie.entry(row.movie_id).or_default().push(Performance {
                performance_id: row.performance_id,
                start,
                format: row.format,
                language: row.language,
                hall: row.hall,
            });
        }

        movies
            .into_iter()
            .map(|m| {
                let last_updated = m
                    .last_updated
                    .parse::<Date>()
                    .map_err(|e| DbErr::Type(format!("movie {} last_updated: {e}", m.id)))?;
                Ok(Title {
                    performances: by_movie.remove(&m.id).unwrap_or_default(),
                    name: m.name,
                    machine_name: m.machine_name,
                    duration: m.duration,
                    classification: m.classification,
                    poster: m.poster,
                    last_updated,
                })
            })
            .collect()
    }

    /// Writes a full day of listings in one transaction. Titles are upserted
    /// on name, showtimes on (movie, date, performance id); showtimes of a
    /// title that vanished from the fresh listing are removed.
    pub async fn put_listings(&self, date: Date, titles: &[Title]) -> Result<(), DbErr> {
        let day = date.to_string();
        let txn = self.db.begin().await?;

        for title in titles {
            let model = movie::ActiveModel {
                id: Default::default(),
                name: Set(title.name.clone()),
                machine_name: Set(title.machine_name.clone()),
                duration: Set(title.duration),
                classification: Set(title.classification.clone()),
                poster: Set(title.poster.clone()),
                last_updated: Set(day.clone()),
            };

            movie::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(movie::Column::Name)
                        .update_columns([
                            movie::Column::MachineName,
                            movie::Column::Duration,
                            movie::Column::Classification,
                            movie::Column::Poster,
                            movie::Column::LastUpdated,
                        ])
                        .to_owned(),
                )
                .exec(&txn)
                .await?;

            let movie_id = movie::Entity::find()
                .filter(movie::Column::Name.eq(title.name.as_str()))
                .one(&txn)
                .await?
                .ok_or_else(|| DbErr::RecordNotFound(format!("movie {:?}", title.name)))?
                .id;

            let fresh: Vec<String> =
                title.performances.iter().map(|p| p.performance_id.clone()).collect();
            showtime::Entity::delete_many()
                .filter(showtime::Column::MovieId.eq(movie_id))
                .filter(showtime::Column::Date.eq(day.as_str()))
                .filter(showtime::Column::PerformanceId.is_not_in(fresh))
                .exec(&txn)
                .await?;

            for chunk in title.performances.chunks(SHOWTIME_CHUNK) {
                let rows = chunk.iter().map(|p| showtime::ActiveModel {
                    id: Default::default(),
                    movie_id: Set(movie_id),
                    date: Set(day.clone()),
                    datetime: Set(clock::to_storage(&p.start)),
                    format: Set(p.format.clone()),
                    language: Set(p.language.clone()),
                    hall: Set(p.hall.clone()),
                    performance_id: Set(p.performance_id.clone()),
                });

                showtime::Entity::insert_many(rows)
                    .on_conflict(
                        OnConflict::columns([
                            showtime::Column::MovieId,
                            showtime::Column::Date,
                            showtime::Column::PerformanceId,
                        ])
                        .update_columns([
                            showtime::Column::Datetime,
                            showtime::Column::Format,
                            showtime::Column::Language,
                            showtime::Column::Hall,
                        ])
                        .to_owned(),
                    )
                    .exec(&txn)
                    .await?;
            }
        }

        txn.commit().await?;
        Ok(())
    }

    /// Deletes showtimes dated before `cutoff` and titles last refreshed
    /// before it. Returns the number of rows removed.
    pub async fn prune_before(&self, cutoff: Date) -> Result<u64, DbErr> {
        let cut = cutoff.to_string();
        let txn = self.db.begin().await?;

        let showtimes = showtime::Entity::delete_many()
            .filter(showtime::Column::Date.lt(cut.as_str()))
            .exec(&txn)
            .await?
            .rows_affected;
        let movies = movie::Entity::delete_many()
            .filter(movie::Column::LastUpdated.lt(cut.as_str()))
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;
        Ok(showtimes + movies)
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::db::test_store;

    fn perf(id: &str, start: &str, hall: &str) -> Performance {
        Performance {
            performance_id: id.to_string(),
            start: clock::parse_start(start).unwrap(),
            format: "2D".to_string(),
            language: "Subtitulada".to_string(),
            hall: hall.to_string(),
        }
    }

    fn title(name: &str, day: Date, performances: Vec<Performance>) -> Title {
        Title {
            name: name.to_string(),
            machine_name: name.to_lowercase().replace(' ', "-"),
            duration: 118,
            classification: "12".to_string(),
            poster: format!("https://img.example/{name}.jpg"),
            last_updated: day,
            performances,
        }
    }

    async fn showtime_rows(store: &ListingStore) -> u64 {
        showtime::Entity::find().count(store.db()).await.unwrap()
    }

    #[tokio::test]
    async fn empty_store_has_no_listings() {
        let (_dir, store) = test_store().await;
        let day = date(2024, 9, 12);
        assert!(!store.has_listings(day).await.unwrap());
        assert!(store.listings_for(day).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rewriting_the_same_day_is_idempotent() {
        let (_dir, store) = test_store().await;
        let day = date(2024, 9, 12);
        let titles = vec![
            title(
                "Beetlejuice Beetlejuice",
                day,
                vec![
                    perf("1001", "2024-09-12T14:30:00-05:00", "3"),
                    perf("1002", "2024-09-12T20:40:00-05:00", "3"),
                ],
            ),
            title("Alien: Romulus", day, vec![perf("2001", "2024-09-12T16:00:00-05:00", "5")]),
        ];

        store.put_listings(day, &titles).await.unwrap();
        store.put_listings(day, &titles).await.unwrap();

        assert_eq!(showtime_rows(&store).await, 3);
        assert_eq!(movie::Entity::find().count(store.db()).await.unwrap(), 2);
        assert!(store.has_listings(day).await.unwrap());
    }

    #[tokio::test]
    async fn reads_are_ordered_and_rezoned() {
        let (_dir, store) = test_store().await;
        let day = date(2024, 9, 12);
        let titles = vec![
            title(
                "Beetlejuice Beetlejuice",
                day,
                vec![
                    perf("1002", "2024-09-12T20:40:00-05:00", "3"),
                    perf("1001", "2024-09-13T00:30:00+00:00", "3"),
                ],
            ),
            title("Alien: Romulus", day, vec![perf("2001", "2024-09-12T16:00:00-05:00", "5")]),
        ];
        store.put_listings(day, &titles).await.unwrap();

        let read = store.listings_for(day).await.unwrap();
        let names: Vec<_> = read.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Alien: Romulus", "Beetlejuice Beetlejuice"]);

        let starts: Vec<_> =
            read[1].performances.iter().map(|p| clock::to_wire(&p.start)).collect();
        assert_eq!(starts, ["2024-09-12T19:30:00-05:00", "2024-09-12T20:40:00-05:00"]);
        assert_eq!(read[1].last_updated, day);
    }

    #[tokio::test]
    async fn upsert_overwrites_fields_and_drops_vanished_performances() {
        let (_dir, store) = test_store().await;
        let day = date(2024, 9, 12);
        store
            .put_listings(
                day,
                &[title(
                    "Deadpool & Wolverine",
                    day,
                    vec![
                        perf("3001", "2024-09-12T15:00:00-05:00", "1"),
                        perf("3002", "2024-09-12T18:00:00-05:00", "1"),
                    ],
                )],
            )
            .await
            .unwrap();

        store
            .put_listings(
                day,
                &[title(
                    "Deadpool & Wolverine",
                    day,
                    vec![perf("3001", "2024-09-12T15:10:00-05:00", "7")],
                )],
            )
            .await
            .unwrap();

        let read = store.listings_for(day).await.unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].performances.len(), 1);
        assert_eq!(read[0].performances[0].hall, "7");
        assert_eq!(clock::to_wire(&read[0].performances[0].start), "2024-09-12T15:10:00-05:00");
    }

    #[tokio::test]
    async fn a_day_never_serves_another_days_rows() {
        let (_dir, store) = test_store().await;
        let d1 = date(2024, 9, 12);
        let d2 = date(2024, 9, 13);
        store
            .put_listings(
                d1,
                &[title("Alien: Romulus", d1, vec![perf("1", "2024-09-12T16:00:00-05:00", "5")])],
            )
            .await
            .unwrap();

        assert!(!store.has_listings(d2).await.unwrap());
        assert!(store.listings_for(d2).await.unwrap().is_empty());

        store
            .put_listings(
                d2,
                &[title("Alien: Romulus", d2, vec![perf("9", "2024-09-13T16:00:00-05:00", "5")])],
            )
            .await
            .unwrap();

        let read = store.listings_for(d2).await.unwrap();
        assert_eq!(read[0].performances.len(), 1);
        assert_eq!(read[0].performances[0].performance_id, "9");
        // the title moved to d2, so d1 no longer has it
        assert!(store.listings_for(d1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prune_removes_history_before_cutoff() {
        let (_dir, store) = test_store().await;
        let old = date(2024, 8, 1);
        let today = date(2024, 9, 12);
        store
            .put_listings(
                old,
                &[title("Twisters", old, vec![perf("1", "2024-08-01T16:00:00-05:00", "2")])],
            )
            .await
            .unwrap();
        store
            .put_listings(
                today,
                &[title(
                    "Alien: Romulus",
                    today,
                    vec![perf("2", "2024-09-12T16:00:00-05:00", "5")],
                )],
            )
            .await
            .unwrap();

        let removed = store.prune_before(date(2024, 8, 13)).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(showtime_rows(&store).await, 1);
        assert_eq!(store.listings_for(today).await.unwrap().len(), 1);
    }
}
