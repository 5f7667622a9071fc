//! Local runtime host: turns a [`DashboardConfig`] into a live [`Env`] backed by sled and
//! SQLite, so the dashboard can be pointed at real data during development.

mod sled_bucket;
mod sled_kv;
mod sqlite;

pub use sled_bucket::SledBucket;
pub use sled_kv::SledKvNamespace;
pub use sqlite::SqliteDatabase;

use crate::config::DashboardConfig;
use crate::env::{Env, EnvObject, EnvValue, ShapeObject};
use crate::error::HostError;
use std::path::Path;

const KV_DIR: &str = "kv";
const BUCKET_DIR: &str = "r2";
const DATABASE_DIR: &str = "d1";

fn bind_unique(env: &mut Env, name: &str, value: EnvValue) -> Result<(), HostError> {
    if env.contains(name) {
        return Err(HostError::DuplicateBinding(name.to_string()));
    }
    env.bind(name, value);
    Ok(())
}

/// Materialises every configured binding, in config order: vars, KV namespaces, buckets,
/// databases, connection configs. A binding name may appear only once across all lists.
pub fn build_env(config: &DashboardConfig) -> Result<Env, HostError> {
    let root = Path::new(&config.storage_path);
    if !config.ephemeral {
        for dir in [KV_DIR, BUCKET_DIR, DATABASE_DIR] {
            std::fs::create_dir_all(root.join(dir))?;
        }
    }

    let mut env = Env::new();

    for var in &config.vars {
        bind_unique(&mut env, &var.name, EnvValue::from(var.value.clone()))?;
    }

    for ns in &config.kv_namespaces {
        let opened = if config.ephemeral {
            SledKvNamespace::temporary()
        } else {
            SledKvNamespace::open_path(root.join(KV_DIR).join(&ns.binding))
        };
        let kv = opened.map_err(|source| HostError::Kv {
            binding: ns.binding.clone(),
            source,
        })?;
        bind_unique(&mut env, &ns.binding, EnvObject::new(kv).into())?;
        tracing::info!(binding = %ns.binding, "KV namespace ready");
    }

    for b in &config.r2_buckets {
        let opened = if config.ephemeral {
            SledBucket::temporary()
        } else {
            SledBucket::open_path(root.join(BUCKET_DIR).join(&b.binding))
        };
        let bucket = opened.map_err(|source| HostError::Bucket {
            binding: b.binding.clone(),
            source,
        })?;
        bind_unique(&mut env, &b.binding, EnvObject::new(bucket).into())?;
        tracing::info!(binding = %b.binding, "bucket ready");
    }

    for d in &config.d1_databases {
        let opened = if config.ephemeral {
            SqliteDatabase::in_memory()
        } else {
            SqliteDatabase::open_path(
                root.join(DATABASE_DIR).join(format!("{}.sqlite3", d.binding)),
            )
        };
        let db = opened.map_err(|source| HostError::Database {
            binding: d.binding.clone(),
            source,
        })?;
        bind_unique(&mut env, &d.binding, EnvObject::new(db).into())?;
        tracing::info!(binding = %d.binding, "database ready");
    }

    for h in &config.hyperdrive {
        let shape = ShapeObject::new()
            .with_value("connectionString", EnvValue::from(h.connection_string.clone()));
        bind_unique(&mut env, &h.binding, EnvObject::new(shape).into())?;
    }

    tracing::info!(bindings = env.len(), ephemeral = config.ephemeral, "environment built");
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, CapabilityKind};
    use crate::config::{ConnectionBinding, ResourceBinding, VarBinding};

    fn config() -> DashboardConfig {
        DashboardConfig {
            ephemeral: true,
            vars: vec![VarBinding {
                name: "API_URL".into(),
                value: serde_json::json!("https://example.test"),
            }],
            kv_namespaces: vec![ResourceBinding {
                binding: "CACHE".into(),
            }],
            r2_buckets: vec![ResourceBinding {
                binding: "ASSETS".into(),
            }],
            d1_databases: vec![ResourceBinding {
                binding: "DB".into(),
            }],
            hyperdrive: vec![ConnectionBinding {
                binding: "PG".into(),
                connection_string: "postgres://localhost/app".into(),
            }],
            ..DashboardConfig::default()
        }
    }

    #[test]
    fn bindings_classify_as_their_backends() {
        let env = build_env(&config()).unwrap();
        let kinds: Vec<_> = env.iter().map(|(name, v)| (name, classify(v).kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("API_URL", CapabilityKind::String),
                ("CACHE", CapabilityKind::KvNamespace),
                ("ASSETS", CapabilityKind::ObjectBucket),
                ("DB", CapabilityKind::Database),
                ("PG", CapabilityKind::ConnectionConfig),
            ]
        );
        let cache = env.get("CACHE").unwrap();
        assert!(classify(cache).kv_namespace().is_some());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut config = config();
        config.r2_buckets[0].binding = "CACHE".into();
        let err = build_env(&config).unwrap_err();
        assert!(matches!(err, HostError::DuplicateBinding(name) if name == "CACHE"));
    }

    #[test]
    fn persistent_stores_live_under_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig {
            ephemeral: false,
            storage_path: dir.path().to_string_lossy().into_owned(),
            ..config()
        };
        build_env(&config).unwrap();
        assert!(dir.path().join("kv").join("CACHE").exists());
        assert!(dir.path().join("r2").join("ASSETS").exists());
        assert!(dir.path().join("d1").join("DB.sqlite3").exists());
    }
}
