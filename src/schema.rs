// Column layout must stay in step with the `TableShape` impls in `models.rs`,
// which create these tables at startup.

diesel::table! {
    authors (row_id) {
        row_id -> Int4,
        id -> Text,
        name -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    books (row_id) {
        row_id -> Int4,
        id -> Text,
        name -> Text,
        pages -> Int4,
        stock -> Int4,
        cost -> Float8,
        stock_code -> Text,
        isbn -> Text,
        author_id -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(authors, books);
