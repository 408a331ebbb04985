// Mirrors migrations/2024-09-01-000000_create_polls.

diesel::table! {
    polls (id) {
        id -> Uuid,
        user_id -> Uuid,
        question -> Text,
        options -> Array<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        #[max_length = 100]
        display_name -> Varchar,
    }
}

diesel::table! {
    votes (id) {
        id -> Uuid,
        poll_id -> Uuid,
        user_id -> Nullable<Uuid>,
        option_index -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(votes -> polls (poll_id));

diesel::allow_tables_to_appear_in_same_query!(
    polls,
    users,
    votes,
);
