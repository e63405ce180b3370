//! Per-node timing and cache statistics
//!
//! The profiler is an optional observer of one evaluation (or several, if
//! the caller reuses it across a batch of its own). Node times are
//! exclusive of descendant time: a node is charged only for the work of
//! its own kind-compute. A disabled profiler records nothing and takes no
//! timestamps, so it is never a correctness input.

use std::collections::HashMap;
use std::time::Duration;

/// Raw counters for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeStats {
    pub elapsed: Duration,
    pub calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl NodeStats {
    fn hit_rate(&self) -> f64 {
        let accesses = self.cache_hits + self.cache_misses;
        if accesses == 0 {
            0.0
        } else {
            self.cache_hits as f64 / accesses as f64
        }
    }
}

/// One row of the structured profiler view, sorted by elapsed time.
#[derive(Debug, Clone)]
pub struct NodeReport {
    pub name: String,
    pub elapsed: Duration,
    pub calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
}

/// Aggregated profiler snapshot.
#[derive(Debug, Clone)]
pub struct ProfilerStats {
    pub total_time: Duration,
    pub total_calls: u64,
    pub cache_hit_rate: f64,
    pub slowest_node: Option<String>,
    pub most_called_node: Option<String>,
    /// Per-node rows sorted by elapsed descending (name ascending on ties).
    pub nodes: Vec<NodeReport>,
}

/// Collects per-node timing and hit/miss counters during evaluation.
#[derive(Debug, Clone)]
pub struct Profiler {
    enabled: bool,
    stats: HashMap<String, NodeStats>,
}

impl Profiler {
    pub fn new() -> Self {
        Self { enabled: true, stats: HashMap::new() }
    }

    /// A profiler whose hooks are all no-ops.
    pub fn disabled() -> Self {
        Self { enabled: false, stats: HashMap::new() }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn node_stats(&self, name: &str) -> Option<&NodeStats> {
        self.stats.get(name)
    }

    pub fn reset(&mut self) {
        self.stats.clear();
    }

    pub(crate) fn record_cache_hit(&mut self, name: &str) {
        if !self.enabled {
            return;
        }
        self.entry(name).cache_hits += 1;
    }

    pub(crate) fn record_cache_miss(&mut self, name: &str) {
        if !self.enabled {
            return;
        }
        self.entry(name).cache_misses += 1;
    }

    pub(crate) fn record_compute(&mut self, name: &str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        let stats = self.entry(name);
        stats.elapsed += elapsed;
        stats.calls += 1;
    }

    fn entry(&mut self, name: &str) -> &mut NodeStats {
        if !self.stats.contains_key(name) {
            self.stats.insert(name.to_string(), NodeStats::default());
        }
        self.stats.get_mut(name).expect("entry just inserted")
    }

    /// Aggregate snapshot of everything recorded so far.
    pub fn stats(&self) -> ProfilerStats {
        let mut nodes: Vec<NodeReport> = self
            .stats
            .iter()
            .map(|(name, s)| NodeReport {
                name: name.clone(),
                elapsed: s.elapsed,
                calls: s.calls,
                cache_hits: s.cache_hits,
                cache_misses: s.cache_misses,
                cache_hit_rate: s.hit_rate(),
            })
            .collect();
        nodes.sort_by(|a, b| b.elapsed.cmp(&a.elapsed).then_with(|| a.name.cmp(&b.name)));

        let total_time = self.stats.values().map(|s| s.elapsed).sum();
        let total_calls = self.stats.values().map(|s| s.calls).sum();
        let total_hits: u64 = self.stats.values().map(|s| s.cache_hits).sum();
        let total_misses: u64 = self.stats.values().map(|s| s.cache_misses).sum();
        let accesses = total_hits + total_misses;
        let cache_hit_rate = if accesses == 0 { 0.0 } else { total_hits as f64 / accesses as f64 };

        let most_called_node = nodes
            .iter()
            .max_by(|a, b| a.calls.cmp(&b.calls).then_with(|| b.name.cmp(&a.name)))
            .map(|n| n.name.clone());

        ProfilerStats {
            total_time,
            total_calls,
            cache_hit_rate,
            slowest_node: nodes.first().map(|n| n.name.clone()),
            most_called_node,
            nodes,
        }
    }

    /// Human-readable report: totals plus the top `top_n` slowest nodes.
    pub fn report(&self, top_n: usize) -> String {
        if !self.enabled {
            return "Profiling is disabled".to_string();
        }

        let stats = self.stats();
        let mut out = String::new();
        out.push_str("Performance Report\n");
        out.push_str(&"=".repeat(72));
        out.push('\n');
        out.push_str(&format!(
            "Total time: {:.3}ms\n",
            stats.total_time.as_secs_f64() * 1000.0
        ));
        out.push_str(&format!("Total calls: {}\n", stats.total_calls));
        out.push_str(&format!("Cache hit rate: {:.1}%\n", stats.cache_hit_rate * 100.0));
        out.push_str(&format!("\nTop {} slowest nodes:\n", top_n));
        out.push_str(&"-".repeat(72));
        out.push('\n');

        for (i, node) in stats.nodes.iter().take(top_n).enumerate() {
            let avg_ms = if node.calls > 0 {
                node.elapsed.as_secs_f64() * 1000.0 / node.calls as f64
            } else {
                0.0
            };
            out.push_str(&format!(
                "{:2}. {:<30} {:>9.3}ms ({} calls, {:.3}ms avg, hit rate {:.1}%)\n",
                i + 1,
                node.name,
                node.elapsed.as_secs_f64() * 1000.0,
                node.calls,
                avg_ms,
                node.cache_hit_rate * 100.0,
            ));
        }

        out.push_str(&"=".repeat(72));
        out
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new()
    }
}
