//! Diesel schema definitions for the Sentry server.

diesel::table! {
    projects (id) {
        id -> Text,
        name -> Text,
        filename -> Text,
        file_path -> Text,
        file_size -> BigInt,
        upload_date -> Timestamp,
        health_score -> Double,
        status -> Text,
        total_elements -> BigInt,
        validated_elements -> BigInt,
        critical_issues -> Integer,
        warning_issues -> Integer,
        info_issues -> Integer,
        health_report -> Nullable<Text>,
    }
}

diesel::table! {
    validation_results (id) {
        id -> Text,
        project_id -> Text,
        position -> Integer,
        rule_name -> Text,
        category -> Text,
        status -> Text,
        issues_count -> Integer,
        description -> Text,
        created_date -> Timestamp,
    }
}

diesel::joinable!(validation_results -> projects (project_id));

diesel::allow_tables_to_appear_in_same_query!(projects, validation_results);
