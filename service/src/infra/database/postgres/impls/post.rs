//! [`Post`]-related [`Database`] implementations.

use common::{
    operations::{By, Delete, Insert, Lock, Select, Update},
    pagination::Order,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{post, Post},
    infra::{
        database::{
            self,
            postgres::{Connection, FuzzPattern},
            Postgres,
        },
        Database,
    },
    read,
};

/// [`Order`] the [`Post`]s are listed in: newest first.
const LIST_ORDER: Order = Order::Descending;

/// Builds a [`Post`] out of a [`Row`] of the `posts` table.
fn from_row(row: &Row) -> Post {
    Post {
        id: row.get("id"),
        title: row.get("title"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Post>, post::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Post>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Post>, post::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: post::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id, title, author_id, created_at, updated_at \
            FROM posts \
            WHERE id = $1::UUID \
            LIMIT 1";
        self.query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| row.as_ref().map(from_row))
    }
}

impl<C> Database<Insert<Post>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(post): Insert<Post>,
    ) -> Result<Self::Ok, Self::Err> {
        let Post {
            id,
            title,
            author_id,
            created_at,
            updated_at,
        } = post;

        const SQL: &str = "\
            INSERT INTO posts (\
                id, title, author_id, created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::UUID, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ\
            )";
        self.exec(SQL, &[&id, &title, &author_id, &created_at, &updated_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Update<Post>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(post): Update<Post>,
    ) -> Result<Self::Ok, Self::Err> {
        let Post {
            id,
            title,
            author_id: _,
            created_at: _,
            updated_at,
        } = post;

        const SQL: &str = "\
            UPDATE posts \
            SET title = $2::VARCHAR, \
                updated_at = $3::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id, &title, &updated_at])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Delete<By<Post, post::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Post, post::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: post::Id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM posts \
            WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C> Database<Lock<By<Post, post::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Post, post::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: post::Id = by.into_inner();

        const SQL: &str = "\
            SELECT id \
            FROM posts \
            WHERE id = $1::UUID \
            FOR UPDATE";
        self.query(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}

impl<C>
    Database<Select<By<read::post::list::Page, read::post::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = read::post::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::post::list::Page, read::post::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::post::list::Selector {
            arguments,
            filter: read::post::list::Filter { title },
        } = by.into_inner();

        let limit = i64::try_from(arguments.limit())
            .unwrap_or(i64::MAX)
            .saturating_add(1);

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&limit];

        let cursor_idx = arguments.cursor().map(|c| {
            ps.push(c);
            ps.len()
        });

        let title_pattern = title.as_deref().map(FuzzPattern::new);
        let title_pattern_idx = title_pattern.as_ref().map(|p| {
            ps.push(p);
            ps.len()
        });

        let kind = arguments.kind();
        let sql = format!(
            "SELECT id \
             FROM posts \
             WHERE true \
                   {cursor} \
                   {title_filtering} \
             ORDER BY id {order} \
             LIMIT $1::INT8",
            cursor = cursor_idx.into_iter().format_with("", |idx, f| {
                let op = kind.operator(LIST_ORDER);
                f(&format_args!("AND id {op} ${idx}::UUID"))
            }),
            title_filtering =
                title_pattern_idx.into_iter().format_with("", |idx, f| {
                    f(&format_args!(
                        "AND LOWER(title) SIMILAR TO LOWER(${idx}::VARCHAR)"
                    ))
                }),
            order = kind.order(LIST_ORDER).sql(),
        );
        let rows = self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?;

        let has_more = rows.len() > arguments.limit();
        let edges = rows
            .into_iter()
            .take(arguments.limit())
            .map(|row| {
                let id = row.get("id");
                (id, id)
            })
            .collect::<Vec<_>>();

        Ok(read::post::list::Page::new(&arguments, edges, has_more))
    }
}

impl<C>
    Database<
        Select<
            By<read::post::list::TotalCount, read::post::list::Filter>,
        >,
    > for Postgres<C>
where
    C: Connection,
{
    type Ok = read::post::list::TotalCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::post::list::TotalCount, read::post::list::Filter>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::post::list::Filter { title } = by.into_inner();
        let title_pattern = title.as_deref().map(FuzzPattern::new);

        const SQL: &str = "\
            SELECT COUNT(*) \
            FROM posts \
            WHERE $1::VARCHAR IS NULL \
               OR LOWER(title) SIMILAR TO LOWER($1::VARCHAR)";
        let count = self
            .query(SQL, &[&title_pattern])
            .await
            .map_err(tracerr::wrap!())?
            .first()
            .map_or(0, |row| row.get::<_, i64>(0));
        Ok(count.into())
    }
}
