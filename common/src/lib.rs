use anyhow::{bail, Context};
use dashmap::DashMap;
use itertools::Itertools;
use mapreduce::{KeyValue, MapReduce, RunConfig};
use std::{fs::read_to_string, ops::Deref, sync::Arc};
use tracing::info;

pub const APPS: &[&str] = &["wc", "indexer"];

/// The two entry points every application provides.
#[derive(Debug, Clone, Copy)]
pub struct Api {
    pub map: fn(filename: &str, contents: &str) -> Vec<KeyValue>,
    pub reduce: fn(key: &str, values: Vec<String>) -> String,
}

#[derive(Debug, Clone)]
pub struct App {
    pub app_name: String,
    api: Api,
}

impl App {
    /// An application that is not in the built-in registry.
    pub fn new(app_name: &str, api: Api) -> Self {
        Self {
            app_name: app_name.to_string(),
            api,
        }
    }

    pub fn load(app_name: &str) -> anyhow::Result<Self> {
        let api = match app_name {
            "wc" => Api {
                map: app_wc::map,
                reduce: app_wc::reduce,
            },
            "indexer" => Api {
                map: app_indexer::map,
                reduce: app_indexer::reduce,
            },
            other => bail!("unknown app {other:?}, expected one of: {}", APPS.join(", ")),
        };
        Ok(Self::new(app_name, api))
    }

    /// Runs the app on the engine. Output pairs are sorted by key.
    pub fn run<I: AsRef<str>>(
        &self,
        input_files: &[I],
        config: &RunConfig,
    ) -> anyhow::Result<Vec<(String, String)>> {
        let output: Arc<DashMap<String, String>> = Arc::new(DashMap::new());
        let sink = Arc::clone(&output);
        let Api { map, reduce } = self.api;

        let summary = MapReduce::new(
            move |ctx, file| {
                let contents = read_to_string(file).with_context(|| format!("reading {file}"))?;
                for kv in map(file, &contents) {
                    ctx.emit(&kv.key, &kv.value)?;
                }
                Ok(())
            },
            move |ctx, key, _partition| {
                let value = reduce(key, ctx.values(key).collect());
                sink.insert(key.to_string(), value);
                Ok(())
            },
        )
        .run_with(config, input_files)
        .with_context(|| format!("running app {}", self.app_name))?;

        if summary.map_failures > 0 {
            bail!(
                "{} of {} input files could not be mapped",
                summary.map_failures,
                summary.inputs
            );
        }
        info!(app = %self.app_name, keys = summary.keys_reduced, "app finished");

        Ok(output
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .sorted()
            .collect())
    }

    /// Single-threaded reference: map everything, sort, group, reduce.
    pub fn run_sequential<I: AsRef<str>>(
        &self,
        input_files: &[I],
    ) -> anyhow::Result<Vec<(String, String)>> {
        let mut intermediate = Vec::new();
        for file in input_files {
            let file = file.as_ref();
            let contents = read_to_string(file).with_context(|| format!("reading {file}"))?;
            intermediate.extend(self.map(file, &contents));
        }
        intermediate.sort();

        Ok(intermediate
            .into_iter()
            .group_by(|kv| kv.key.clone())
            .into_iter()
            .map(|(key, kvs)| {
                let output = self.reduce(&key, kvs.map(|kv| kv.value).collect_vec());
                (key, output)
            })
            .collect())
    }
}

impl Deref for App {
    type Target = Api;

    fn deref(&self) -> &Self::Target {
        &self.api
    }
}

impl Api {
    pub fn map(&self, filename: &str, contents: &str) -> Vec<KeyValue> {
        (self.map)(filename, contents)
    }

    pub fn reduce(&self, key: &str, values: Vec<String>) -> String {
        (self.reduce)(key, values)
    }
}
