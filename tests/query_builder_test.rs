#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use wildtrails_tour_service::query::{
        FilterCondition, FilterOp, FilterValue, Projection, Query, SortKey, DEFAULT_LIMIT,
        DEFAULT_PAGE,
    };

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_filter_sort_and_pagination_example() {
        // difficulty=easy&price[gte]=500&sort=-price&page=2&limit=5
        let q = Query::build(&params(&[
            ("difficulty", "easy"),
            ("price[gte]", "500"),
            ("sort", "-price"),
            ("page", "2"),
            ("limit", "5"),
        ]));

        assert_eq!(
            q.filters,
            vec![
                FilterCondition::new("difficulty", FilterOp::Eq, FilterValue::Text("easy".into())),
                FilterCondition::new("price", FilterOp::Gte, FilterValue::Int(500)),
            ]
        );
        assert_eq!(
            q.sort,
            vec![SortKey {
                field: "price".to_string(),
                descending: true
            }]
        );
        assert_eq!(q.page, 2);
        assert_eq!(q.limit, 5);
        assert_eq!(q.offset(), 5);
    }

    #[test]
    fn test_reserved_keys_never_become_filters() {
        let q = Query::build(&params(&[
            ("page", "3"),
            ("limit", "10"),
            ("sort", "name"),
            ("fields", "name,price"),
        ]));
        assert!(q.filters.is_empty());
    }

    #[test]
    fn test_defaults_with_no_parameters() {
        let q = Query::build(&HashMap::new());

        assert!(q.filters.is_empty());
        assert_eq!(q.page, DEFAULT_PAGE);
        assert_eq!(q.limit, DEFAULT_LIMIT);
        assert_eq!(q.offset(), 0);
        // no sort parameter defaults to newest first
        assert_eq!(
            q.sort,
            vec![SortKey {
                field: "created_at".to_string(),
                descending: true
            }]
        );
        assert_eq!(q.projection, Projection::Default);
    }

    #[test]
    fn test_malformed_pagination_silently_defaults() {
        for (page, limit) in [("abc", "xyz"), ("0", "-1"), ("", ""), ("2.5", "1e3")] {
            let q = Query::build(&params(&[("page", page), ("limit", limit)]));
            assert_eq!(q.page, DEFAULT_PAGE, "page {:?}", page);
            assert_eq!(q.limit, DEFAULT_LIMIT, "limit {:?}", limit);
        }
    }

    #[test]
    fn test_multi_key_sort_parsing() {
        let q = Query::build(&params(&[("sort", "-ratings_average,price")]));
        assert_eq!(
            q.sort,
            vec![
                SortKey {
                    field: "ratings_average".to_string(),
                    descending: true
                },
                SortKey {
                    field: "price".to_string(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn test_projection_inclusion_list() {
        let q = Query::build(&params(&[("fields", "name, price ,duration")]));
        assert_eq!(
            q.projection,
            Projection::Include(vec![
                "name".to_string(),
                "price".to_string(),
                "duration".to_string()
            ])
        );
    }

    #[test]
    fn test_build_is_idempotent() {
        let p = params(&[
            ("difficulty", "medium"),
            ("duration[lte]", "14"),
            ("ratings_average[gte]", "4.5"),
            ("sort", "price,-name"),
            ("fields", "name,price"),
            ("page", "4"),
            ("limit", "25"),
        ]);
        assert_eq!(Query::build(&p), Query::build(&p));
    }

    #[test]
    fn test_unknown_operator_suffix_passes_through_as_field() {
        // no semantic validation: the literal key reaches the store
        let q = Query::build(&params(&[("price[ne]", "500")]));
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters[0].field, "price[ne]");
        assert_eq!(q.filters[0].op, FilterOp::Eq);
    }

    #[test]
    fn test_select_rendering() {
        let q = Query::build(&params(&[
            ("difficulty", "easy"),
            ("price[gte]", "500"),
            ("sort", "-price"),
            ("page", "2"),
            ("limit", "5"),
        ]))
        .with_default_filters(vec![FilterCondition::eq(
            "secret_tour",
            FilterValue::Bool(false),
        )]);

        let sql = q.to_select("tours", &["id", "name", "price"]);

        assert_eq!(
            sql.text,
            "SELECT \"id\", \"name\", \"price\" FROM \"tours\" \
             WHERE \"secret_tour\" = $1 AND \"difficulty\" = $2 AND \"price\" >= $3 \
             ORDER BY \"price\" DESC LIMIT 5 OFFSET 5"
        );
        assert_eq!(
            sql.params,
            vec![
                FilterValue::Bool(false),
                FilterValue::Text("easy".to_string()),
                FilterValue::Int(500),
            ]
        );
    }

    #[test]
    fn test_select_rendering_with_inclusion_projection() {
        let q = Query::build(&params(&[("fields", "name,price")]));
        let sql = q.to_select("tours", &["id", "name", "price", "summary"]);
        assert!(sql.text.starts_with("SELECT \"name\", \"price\" FROM \"tours\""));
    }

    #[test]
    fn test_projection_never_reaches_hidden_columns() {
        let q = Query::build(&params(&[(
            "fields",
            "email,password_hash,password_reset_token",
        )]));
        let sql = q.to_select("users", &["id", "name", "email"]);

        assert!(sql.text.starts_with("SELECT \"email\" FROM \"users\""));
        assert!(!sql.text.contains("password_hash"));
        assert!(!sql.text.contains("password_reset_token"));
    }

    #[test]
    fn test_projection_of_only_unknown_fields_falls_back_to_defaults() {
        let q = Query::build(&params(&[("fields", "password_hash,active")]));
        let sql = q.to_select("users", &["id", "name", "email"]);
        assert!(sql.text.starts_with("SELECT \"id\", \"name\", \"email\" FROM \"users\""));
    }

    #[test]
    fn test_huge_page_number_saturates_instead_of_overflowing() {
        let q = Query::build(&params(&[
            ("page", &i64::MAX.to_string()),
            ("limit", "100"),
        ]));

        assert_eq!(q.page, i64::MAX);
        assert_eq!(q.offset(), i64::MAX);

        let sql = q.to_select("tours", &["id"]);
        assert!(sql.text.ends_with(&format!("LIMIT 100 OFFSET {}", i64::MAX)));
    }

    #[test]
    fn test_hostile_field_names_stay_in_identifier_position() {
        let q = Query::build(&params(&[("name\"; DROP TABLE tours; --", "x")]));
        let sql = q.to_select("tours", &["id"]);
        // embedded quotes are doubled, so the whole key stays one identifier
        assert!(sql.text.contains("\"name\"\"; DROP TABLE tours; --\" = $1"));
    }
}
