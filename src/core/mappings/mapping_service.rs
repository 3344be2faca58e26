// Identity mapping tables.
//
// The bot never asks Graph or Discord who maps to whom - all identity
// translation comes from the static tables in the config file. Two of the
// forward tables are also needed in the reverse direction (Discord user ->
// Graph user, Discord channel -> bucket), so those indices are computed
// once here and the whole structure is immutable afterwards.

use std::collections::HashMap;

use crate::config::MappingConfig;

/// All identifier lookup tables, built once at startup.
///
/// None of the mappings are guaranteed to be total: every lookup returns
/// `Option` and callers decide what an absent entry means for them.
pub struct MappingTables {
    /// Graph user id -> Discord user id.
    graph_to_discord: HashMap<String, String>,
    /// Bucket id -> display name.
    bucket_names: HashMap<String, String>,
    /// Graph user id -> display name.
    user_names: HashMap<String, String>,
    /// Discord user id -> Graph user id (inverted at startup).
    discord_to_graph: HashMap<String, String>,
    /// Discord channel id -> bucket id (inverted at startup).
    channel_to_bucket: HashMap<String, String>,
}

impl MappingTables {
    pub fn from_config(mappings: &MappingConfig) -> Self {
        let discord_to_graph = invert("discord_id_mapping", &mappings.discord_id_mapping);
        let channel_to_bucket = invert("discord_channel_mapping", &mappings.discord_channel_mapping);

        Self {
            graph_to_discord: mappings.discord_id_mapping.clone(),
            bucket_names: mappings.bucket_id_to_name_mapping.clone(),
            user_names: mappings.user_id_to_name_mapping.clone(),
            discord_to_graph,
            channel_to_bucket,
        }
    }

    /// Discord user id for a Graph user, if one is mapped.
    pub fn discord_user_for(&self, graph_user_id: &str) -> Option<&str> {
        self.graph_to_discord.get(graph_user_id).map(String::as_str)
    }

    /// Graph user id for a Discord user, if one is mapped.
    pub fn graph_user_for_discord(&self, discord_user_id: &str) -> Option<&str> {
        self.discord_to_graph.get(discord_user_id).map(String::as_str)
    }

    pub fn bucket_name(&self, bucket_id: &str) -> Option<&str> {
        self.bucket_names.get(bucket_id).map(String::as_str)
    }

    pub fn user_name(&self, graph_user_id: &str) -> Option<&str> {
        self.user_names.get(graph_user_id).map(String::as_str)
    }

    /// Bucket id mapped to a Discord channel, if any.
    pub fn bucket_for_channel(&self, channel_id: &str) -> Option<&str> {
        self.channel_to_bucket.get(channel_id).map(String::as_str)
    }
}

/// Invert a forward mapping. The forward tables are expected to be
/// injective; if a value appears twice the later entry wins and the
/// collision is logged so the config can be fixed.
fn invert(table_name: &str, forward: &HashMap<String, String>) -> HashMap<String, String> {
    let mut inverted = HashMap::with_capacity(forward.len());
    for (key, value) in forward {
        if let Some(previous) = inverted.insert(value.clone(), key.clone()) {
            tracing::warn!(
                table = table_name,
                duplicate_value = value.as_str(),
                overwritten_key = previous.as_str(),
                "duplicate value in mapping table, keeping the later entry"
            );
        }
    }
    inverted
}
