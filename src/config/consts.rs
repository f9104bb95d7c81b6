// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Cache directory used when the config does not name one, relative to the
/// working directory
pub const DEFAULT_CACHE_DIR: &str = ".annograph/cache";
/// Fallback worker count when available parallelism cannot be determined
pub const FALLBACK_CONCURRENCY: usize = 4;
/// Config files with this extension are parsed as TOML, everything else as YAML
pub const TOML_EXTENSION: &str = "toml";
