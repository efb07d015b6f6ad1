// bmk/src/infrastructure/repositories/sqlite/schema.rs

diesel::table! {
    bookmarks (id) {
        id -> Integer,
        url -> Text,
        title -> Text,
        desc -> Text,
        notes -> Text,
        created_at -> Text,
        updated_at -> Text,
        last_visit -> Text,
        visit_count -> Integer,
        favorite -> Bool,
        favicon_url -> Text,
        favicon_local -> Text,
        archive_url -> Text,
        archive_timestamp -> Text,
        checksum -> Text,
        last_checked -> Text,
        status_code -> Integer,
        status_text -> Text,
        is_active -> Bool,
    }
}

diesel::table! {
    tags (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    bookmark_tags (bookmark_url, tag_id) {
        bookmark_url -> Text,
        tag_id -> Integer,
    }
}

diesel::joinable!(bookmark_tags -> tags (tag_id));

diesel::allow_tables_to_appear_in_same_query!(bookmarks, tags, bookmark_tags);
