use sea_orm::prelude::Decimal;
use sea_orm::sea_query::{Expr, Func, Order, Query, SelectStatement};
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Select};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use utoipa::IntoParams;

use crate::entities::{category, product, product_category};
use crate::pagination;

/// Open set of optional product-listing parameters, as received.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductListParams {
    /// Comma-separated category names; a product must carry every one (AND).
    pub categories: Option<String>,
    /// Single-name convenience form of `categories`.
    pub category_name: Option<String>,
    /// Alternate AND filter: one condition requiring N distinct matches.
    pub strict_categories: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub search: Option<String>,
    pub in_stock: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn {
    /// Allow-listed sort columns; anything else silently falls back to
    /// creation time. This allow-list is the only defense for a
    /// client-controlled identifier.
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("name") => SortColumn::Name,
            Some("price") => SortColumn::Price,
            Some("created_at") => SortColumn::CreatedAt,
            Some("updated_at") => SortColumn::UpdatedAt,
            _ => SortColumn::CreatedAt,
        }
    }

    fn column(self) -> product::Column {
        match self {
            SortColumn::Name => product::Column::Name,
            SortColumn::Price => product::Column::Price,
            SortColumn::CreatedAt => product::Column::CreatedAt,
            SortColumn::UpdatedAt => product::Column::UpdatedAt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(s) if s.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            Some(s) if s.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Desc,
        }
    }

    fn order(self) -> Order {
        match self {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

/// Normalized listing query: every raw parameter resolved to a typed,
/// bounded form before any SQL is composed.
#[derive(Debug)]
pub struct ProductQuery {
    pub category_names: Vec<String>,
    pub strict_names: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub in_stock: bool,
    pub sort_by: SortColumn,
    pub sort_order: SortOrder,
    pub page: u64,
    pub per_page: u64,
    filters: Value,
}

impl ProductQuery {
    pub fn from_params(params: &ProductListParams) -> Self {
        let mut category_names = params
            .categories
            .as_deref()
            .map(parse_names)
            .unwrap_or_default();
        if let Some(single) = params.category_name.as_deref() {
            for name in parse_names(single) {
                if !category_names.contains(&name) {
                    category_names.push(name);
                }
            }
        }

        let strict_names = params
            .strict_categories
            .as_deref()
            .map(parse_names)
            .unwrap_or_default();

        Self {
            category_names,
            strict_names,
            min_price: parse_price(params.min_price.as_deref()),
            max_price: parse_price(params.max_price.as_deref()),
            search: params
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            in_stock: truthy(params.in_stock.as_deref()),
            sort_by: SortColumn::parse(params.sort_by.as_deref()),
            sort_order: SortOrder::parse(params.sort_order.as_deref()),
            page: pagination::requested_page(params.page),
            per_page: pagination::clamp_per_page(params.per_page),
            filters: filters_echo(params),
        }
    }

    /// Echo of the recognized filter parameters that were supplied,
    /// for client-side state sync.
    pub fn filters(&self) -> Value {
        self.filters.clone()
    }
}

/// Split, trim, lowercase and dedupe a comma-separated name list.
pub fn parse_names(raw: &str) -> Vec<String> {
    let mut names = Vec::new();
    for part in raw.split(',') {
        let name = part.trim().to_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// PHP-style truthiness: absent, empty, "0" and "false" are falsy.
fn truthy(raw: Option<&str>) -> bool {
    match raw {
        Some(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
        None => false,
    }
}

fn parse_price(raw: Option<&str>) -> Option<Decimal> {
    raw.and_then(|s| Decimal::from_str(s.trim()).ok())
}

fn filters_echo(params: &ProductListParams) -> Value {
    let mut echo = Map::new();
    let supplied = [
        ("categories", &params.categories),
        ("category_name", &params.category_name),
        ("strict_categories", &params.strict_categories),
        ("search", &params.search),
        ("min_price", &params.min_price),
        ("max_price", &params.max_price),
        ("in_stock", &params.in_stock),
    ];
    for (key, value) in supplied {
        if let Some(value) = value {
            echo.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    Value::Object(echo)
}

/// Compose the filtered, sorted product listing. Only active products
/// match, no matter how many filters are combined.
pub fn compose(query: &ProductQuery) -> Select<product::Entity> {
    let mut condition = Condition::all().add(product::Column::IsActive.eq(true));

    for name in &query.category_names {
        condition = condition.add(Expr::exists(active_category_match(name)));
    }

    if !query.strict_names.is_empty() {
        condition = condition.add(Expr::exists(strict_category_match(&query.strict_names)));
    }

    if let Some(min) = query.min_price {
        condition = condition.add(product::Column::Price.gte(min));
    }
    if let Some(max) = query.max_price {
        condition = condition.add(product::Column::Price.lte(max));
    }

    if let Some(term) = &query.search {
        condition = condition.add(
            Condition::any()
                .add(product::Column::Name.contains(term))
                .add(product::Column::Description.contains(term)),
        );
    }

    if query.in_stock {
        condition = condition.add(product::Column::Stock.gt(0));
    }

    product::Entity::find()
        .filter(condition)
        .order_by(query.sort_by.column(), query.sort_order.order())
}

/// Correlated EXISTS: the product has an association with an active
/// category of exactly this (lowercased) name.
fn active_category_match(name: &str) -> SelectStatement {
    Query::select()
        .expr(Expr::val(1))
        .from(product_category::Entity)
        .inner_join(
            category::Entity,
            Expr::col((category::Entity, category::Column::Id)).equals((
                product_category::Entity,
                product_category::Column::CategoryId,
            )),
        )
        .and_where(
            Expr::col((product_category::Entity, product_category::Column::ProductId))
                .equals((product::Entity, product::Column::Id)),
        )
        .and_where(Expr::col((category::Entity, category::Column::IsActive)).eq(true))
        .and_where(
            Expr::expr(Func::lower(Expr::col((
                category::Entity,
                category::Column::Name,
            ))))
            .eq(name),
        )
        .to_owned()
}

/// Single EXISTS requiring at least N distinct active-category matches,
/// N = number of distinct requested names.
fn strict_category_match(names: &[String]) -> SelectStatement {
    Query::select()
        .expr(Expr::val(1))
        .from(product_category::Entity)
        .inner_join(
            category::Entity,
            Expr::col((category::Entity, category::Column::Id)).equals((
                product_category::Entity,
                product_category::Column::CategoryId,
            )),
        )
        .and_where(
            Expr::col((product_category::Entity, product_category::Column::ProductId))
                .equals((product::Entity, product::Column::Id)),
        )
        .and_where(Expr::col((category::Entity, category::Column::IsActive)).eq(true))
        .and_where(
            Expr::expr(Func::lower(Expr::col((
                category::Entity,
                category::Column::Name,
            ))))
            .is_in(names.iter().map(String::as_str)),
        )
        .group_by_col((product_category::Entity, product_category::Column::ProductId))
        .and_having(
            Expr::expr(Func::count_distinct(Expr::col((
                category::Entity,
                category::Column::Id,
            ))))
            .gte(names.len() as i64),
        )
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    fn sql(query: &ProductQuery) -> String {
        compose(query).build(DbBackend::Postgres).to_string()
    }

    #[test]
    fn names_are_trimmed_lowercased_and_deduped() {
        assert_eq!(
            parse_names(" Electronics , books,ELECTRONICS,, "),
            vec!["electronics".to_string(), "books".to_string()]
        );
    }

    #[test]
    fn in_stock_uses_php_truthiness() {
        let case = |v: &str| {
            ProductQuery::from_params(&ProductListParams {
                in_stock: Some(v.to_string()),
                ..Default::default()
            })
            .in_stock
        };
        assert!(case("1"));
        assert!(case("true"));
        assert!(case("yes"));
        assert!(!case("0"));
        assert!(!case("false"));
        assert!(!case(""));
        assert!(
            !ProductQuery::from_params(&ProductListParams::default()).in_stock
        );
    }

    #[test]
    fn sort_column_is_allow_listed() {
        assert_eq!(SortColumn::parse(Some("price")), SortColumn::Price);
        assert_eq!(
            SortColumn::parse(Some("DROP TABLE products")),
            SortColumn::CreatedAt
        );
        assert_eq!(SortColumn::parse(None), SortColumn::CreatedAt);
    }

    #[test]
    fn sort_order_is_validated() {
        assert_eq!(SortOrder::parse(Some("asc")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("ASC")), SortOrder::Asc);
        assert_eq!(SortOrder::parse(Some("sideways; --")), SortOrder::Desc);
        assert_eq!(SortOrder::parse(None), SortOrder::Desc);
    }

    #[test]
    fn page_size_is_clamped() {
        let query = ProductQuery::from_params(&ProductListParams {
            per_page: Some(1000),
            ..Default::default()
        });
        assert_eq!(query.per_page, 50);

        let query = ProductQuery::from_params(&ProductListParams::default());
        assert_eq!(query.per_page, 15);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn filters_echo_only_supplied_parameters() {
        let query = ProductQuery::from_params(&ProductListParams {
            search: Some("phone".to_string()),
            in_stock: Some("1".to_string()),
            sort_by: Some("price".to_string()),
            ..Default::default()
        });
        let echo = query.filters();
        assert_eq!(echo["search"], "phone");
        assert_eq!(echo["in_stock"], "1");
        assert!(echo.get("categories").is_none());
        // sort/page state is not part of the filter echo
        assert!(echo.get("sort_by").is_none());
    }

    #[test]
    fn default_listing_only_selects_active_rows() {
        let query = ProductQuery::from_params(&ProductListParams::default());
        let sql = sql(&query);
        assert!(sql.contains(r#""products"."is_active" = TRUE"#), "{sql}");
        assert!(sql.contains(r#"ORDER BY "products"."created_at" DESC"#), "{sql}");
    }

    #[test]
    fn one_exists_condition_per_category_name() {
        let query = ProductQuery::from_params(&ProductListParams {
            categories: Some("Electronics,Books".to_string()),
            ..Default::default()
        });
        let sql = sql(&query);
        assert_eq!(sql.matches("EXISTS").count(), 2, "{sql}");
        assert!(sql.contains("LOWER("), "{sql}");
        assert!(sql.contains("'electronics'"), "{sql}");
        assert!(sql.contains("'books'"), "{sql}");
        assert!(sql.contains(r#""categories"."is_active" = TRUE"#), "{sql}");
    }

    #[test]
    fn strict_variant_counts_distinct_matches() {
        let query = ProductQuery::from_params(&ProductListParams {
            strict_categories: Some("Electronics,Books".to_string()),
            ..Default::default()
        });
        let sql = sql(&query);
        assert_eq!(sql.matches("EXISTS").count(), 1, "{sql}");
        assert!(sql.contains("GROUP BY"), "{sql}");
        assert!(sql.contains("COUNT(DISTINCT"), "{sql}");
        assert!(sql.contains(">= 2"), "{sql}");
    }

    #[test]
    fn price_search_and_stock_filters_compose() {
        let query = ProductQuery::from_params(&ProductListParams {
            min_price: Some("1000".to_string()),
            max_price: Some("2500.50".to_string()),
            search: Some("phone".to_string()),
            in_stock: Some("1".to_string()),
            ..Default::default()
        });
        let sql = sql(&query);
        assert!(sql.contains(r#""products"."price" >="#), "{sql}");
        assert!(sql.contains(r#""products"."price" <="#), "{sql}");
        assert!(sql.contains("'%phone%'"), "{sql}");
        assert!(sql.contains(r#""products"."stock" > 0"#), "{sql}");
    }

    #[test]
    fn malformed_price_bound_is_ignored() {
        let query = ProductQuery::from_params(&ProductListParams {
            min_price: Some("cheap".to_string()),
            ..Default::default()
        });
        assert_eq!(query.min_price, None);
        assert!(!sql(&query).contains(">="));
    }

    #[test]
    fn injection_in_sort_by_falls_back_cleanly() {
        let query = ProductQuery::from_params(&ProductListParams {
            sort_by: Some("DROP TABLE products".to_string()),
            sort_order: Some("DROP".to_string()),
            ..Default::default()
        });
        let sql = sql(&query);
        assert!(sql.contains(r#"ORDER BY "products"."created_at" DESC"#), "{sql}");
        assert!(!sql.contains("DROP"), "{sql}");
    }
}
