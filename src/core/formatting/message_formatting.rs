// Text formatting for Discord output.
//
// Discord caps message bodies at 2000 characters, so list-style responses
// are rendered as one block per entity and then packed into as few
// messages as possible without ever splitting a block.

use crate::core::planner::{DirectoryUser, TaskSummary};

/// Discord's message length cap.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Shown when a directory user has no Discord mapping.
const NO_DISCORD_ID: &str = "Discord ID not available";

/// One text block per directory user.
pub fn render_user_block(user: &DirectoryUser, discord_id: Option<&str>) -> String {
    let mention = match discord_id {
        Some(id) => format!("<@{}>", id),
        None => NO_DISCORD_ID.to_string(),
    };
    format!(
        "User: **{}**\nEmail: {}\nUser ID: {}\nDiscord ID: {}\n\n",
        user.display_name,
        user.mail.as_deref().unwrap_or("None"),
        user.id,
        mention,
    )
}

/// Task block for the per-user listing (bucket shown, assignees omitted).
pub fn render_user_task_block(task: &TaskSummary) -> String {
    format!(
        "Task: **{}**\nBucket: {}\nCreated By: {}\nStatus: {}\nCreated Date: {}\n\n",
        task.title,
        task.bucket_name,
        task.creator_name,
        task.status.label(),
        task.created_date,
    )
}

/// Task block for the per-channel listing (assignees shown, bucket implied
/// by the channel).
pub fn render_channel_task_block(task: &TaskSummary) -> String {
    format!(
        "Task: **{}**\nCreated By: {}\nCreated Date: {}\nStatus: {}\nAssigned to: {}\n\n",
        task.title,
        task.creator_name,
        task.created_date,
        task.status.label(),
        task.assignee_names.join(", "),
    )
}

/// Pack blocks into message bodies of at most `max_length` characters.
///
/// Blocks are never split: if everything fits in one message it is
/// returned as-is, otherwise blocks are appended greedily and the buffer
/// is flushed whenever the next block would overflow. A single block
/// longer than `max_length` is emitted as its own oversized message.
pub fn split_messages(blocks: &[String], max_length: usize) -> Vec<String> {
    let total: usize = blocks.iter().map(String::len).sum();
    if total <= max_length {
        return vec![blocks.concat()];
    }

    let mut messages = Vec::new();
    let mut current = String::new();
    for block in blocks {
        if !current.is_empty() && current.len() + block.len() > max_length {
            messages.push(std::mem::take(&mut current));
        }
        current.push_str(block);
    }
    messages.push(current);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::TaskStatus;

    #[test]
    fn short_input_is_a_single_message() {
        let blocks = vec!["hello ".to_string(), "world".to_string()];
        assert_eq!(split_messages(&blocks, 2000), vec!["hello world"]);
    }

    #[test]
    fn greedy_packing_example() {
        let blocks = vec!["A".repeat(1000), "B".repeat(1000), "C".repeat(1000)];
        let messages = split_messages(&blocks, 2000);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], format!("{}{}", "A".repeat(1000), "B".repeat(1000)));
        assert_eq!(messages[1], "C".repeat(1000));
    }

    #[test]
    fn concatenation_reproduces_input() {
        let blocks = vec![
            "x".repeat(700),
            "y".repeat(900),
            "z".repeat(1200),
            "w".repeat(100),
        ];
        let messages = split_messages(&blocks, 2000);

        assert_eq!(messages.concat(), blocks.concat());
    }

    #[test]
    fn no_message_exceeds_the_limit() {
        let blocks: Vec<String> = (0..20).map(|i| format!("{}", i).repeat(300)).collect();
        let messages = split_messages(&blocks, 2000);

        assert!(messages.iter().all(|m| m.len() <= 2000));
    }

    #[test]
    fn oversized_block_passes_through_alone() {
        let blocks = vec!["a".repeat(3000), "b".repeat(500)];
        let messages = split_messages(&blocks, 2000);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].len(), 3000);
        assert_eq!(messages[1], "b".repeat(500));
    }

    fn sample_summary() -> TaskSummary {
        TaskSummary {
            title: "Write report".to_string(),
            status: TaskStatus::InProgress,
            bucket_name: "Backlog".to_string(),
            creator_name: "Alice".to_string(),
            created_date: "2024-03-15".to_string(),
            assignee_names: vec!["Bob".to_string(), "Carol".to_string()],
        }
    }

    #[test]
    fn user_task_block_layout() {
        let block = render_user_task_block(&sample_summary());
        assert_eq!(
            block,
            "Task: **Write report**\nBucket: Backlog\nCreated By: Alice\n\
             Status: In Progress\nCreated Date: 2024-03-15\n\n"
        );
    }

    #[test]
    fn channel_task_block_lists_assignees() {
        let block = render_channel_task_block(&sample_summary());
        assert!(block.contains("Assigned to: Bob, Carol\n"));
        assert!(!block.contains("Bucket:"));
    }

    #[test]
    fn user_block_falls_back_when_unmapped() {
        let user = DirectoryUser {
            id: "graph-a".to_string(),
            display_name: "Alice".to_string(),
            mail: None,
        };

        let mapped = render_user_block(&user, Some("123"));
        assert!(mapped.contains("Discord ID: <@123>"));

        let unmapped = render_user_block(&user, None);
        assert!(unmapped.contains("Discord ID: Discord ID not available"));
        assert!(unmapped.contains("Email: None"));
    }
}
