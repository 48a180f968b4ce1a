use uuid::Uuid;

/// Genera un identificador nuevo para un paquete derivado (hex en minúsculas,
/// válido como parte de una referencia de imagen).
pub fn generate_package_id() -> String {
    Uuid::new_v4().simple().to_string()
}
