use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::Deserialize;
use typeload_core::{ChunkMap, CorrelationOrder};

/// Optional YAML defaults for `typeload run`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct RunFile {
    pub document: Option<String>,
    pub interval: Option<YamlDuration>,
    pub concurrency: Option<usize>,
    pub chunks: Option<usize>,
    pub checkpoint_every: Option<u64>,
    pub snapshot_interval: Option<YamlDuration>,
    pub correlation: Option<String>,
    pub chart_len: Option<usize>,

    #[serde(default)]
    pub histogram: HistogramYaml,

    #[serde(default)]
    pub loopback: LoopbackYaml,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct HistogramYaml {
    pub bucket_ms: Option<f64>,
    pub buckets: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct LoopbackYaml {
    pub ack_delay: Option<YamlDuration>,
    pub ping: Option<YamlDuration>,
    pub refuse_connections: Option<usize>,
}

impl RunFile {
    pub(crate) fn correlation(&self) -> anyhow::Result<Option<CorrelationOrder>> {
        self.correlation
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .to_ascii_lowercase()
                    .parse::<CorrelationOrder>()
                    .with_context(|| format!("invalid correlation `{raw}` (expected fifo or lifo)"))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    pub(crate) fn into_inner(self) -> Duration {
        self.0
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 250ms), integer seconds, or float seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(|v| YamlDuration(Duration::from_secs(v)))
                    .map_err(|_| E::custom("duration must not be negative"))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if !v.is_finite() || v < 0.0 {
                    return Err(E::custom("duration must be a non-negative, finite number"));
                }
                Ok(YamlDuration(Duration::from_secs_f64(v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v.trim()).map_err(E::custom)?;
                Ok(YamlDuration(d))
            }
        }

        deserializer.deserialize_any(V)
    }
}

pub fn looks_like_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase()),
        Some(ext) if ext == "yml" || ext == "yaml"
    )
}

pub(crate) async fn load_run_file(path: &Path) -> anyhow::Result<RunFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read run file: {}", path.display()))?;

    serde_yaml::from_slice(&bytes)
        .with_context(|| format!("failed to parse run file: {}", path.display()))
}

/// Reads a `key: text` YAML mapping, keeping the file's key order.
pub(crate) async fn load_chunk_map(path: &Path) -> anyhow::Result<ChunkMap> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read chunk map: {}", path.display()))?;
    parse_chunk_map(&bytes).with_context(|| format!("invalid chunk map: {}", path.display()))
}

fn parse_chunk_map(bytes: &[u8]) -> anyhow::Result<ChunkMap> {
    let raw: serde_yaml::Mapping = serde_yaml::from_slice(bytes).context("failed to parse YAML")?;

    let mut out = ChunkMap::new();
    for (k, v) in raw {
        let key = match k {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            other => anyhow::bail!("chunk key must be a string, got {other:?}"),
        };
        let serde_yaml::Value::String(text) = v else {
            anyhow::bail!("chunk `{key}` must be a string");
        };
        out.insert(key, text);
    }
    Ok(out)
}

pub(crate) fn render_chunk_map(chunks: &ChunkMap) -> anyhow::Result<String> {
    let mut doc = serde_yaml::Mapping::new();
    for (k, v) in chunks.iter() {
        doc.insert(k.into(), v.into());
    }
    serde_yaml::to_string(&doc).context("failed to serialize YAML")
}

pub(crate) async fn write_text_file(path: &Path, s: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    tokio::fs::write(path, s)
        .await
        .with_context(|| format!("failed to write file: {}", path.display()))?;

    Ok(())
}
