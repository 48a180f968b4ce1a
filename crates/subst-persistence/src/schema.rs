//! Esquema Diesel (escrito a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    compendia (id) {
        id -> Text,
        owner -> Text,
        metadata -> Jsonb,
        created_at -> Timestamptz,
    }
}
