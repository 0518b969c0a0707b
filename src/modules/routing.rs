use derive_more::with_trait::Display;
use serde::Serialize;

use crate::modules::types::Robot;

/// A post title that one robot must forward, with the phones to mention.
#[derive(Debug, Clone, Display, Serialize, PartialEq, Eq)]
#[display("robot {robot_index} -> {mentions:?}")]
pub struct Dispatch {
    pub robot_index: usize,
    pub mentions: Vec<String>,
}

impl Robot {
    /// Decides whether this robot forwards `title`.
    ///
    /// Keywords match case-insensitively as substrings of the title. A
    /// `receive_all` robot forwards everything and uses keywords only to pick
    /// mentions; any other robot forwards only when some keyword matched.
    /// `always_at` recipients are mentioned whenever the robot forwards.
    pub fn dispatch(&self, title: &str) -> Option<Dispatch> {
        if !self.enabled {
            return None;
        }

        let title = title.to_lowercase();
        let mut matched = false;
        let mut mentions = Vec::new();
        for recipient in &self.recipients {
            let hit = recipient
                .keywords
                .iter()
                .any(|keyword| title.contains(&keyword.to_lowercase()));
            matched |= hit;
            if hit || recipient.always_at {
                mentions.push(recipient.phone.clone());
            }
        }

        (self.receive_all || matched).then(|| Dispatch {
            robot_index: self.index,
            mentions,
        })
    }
}

pub fn route(robots: &[Robot], title: &str) -> Vec<Dispatch> {
    robots.iter().filter_map(|robot| robot.dispatch(title)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::types::Recipient;

    fn robot(index: usize, receive_all: bool, recipients: Vec<Recipient>) -> Robot {
        Robot {
            index,
            name: format!("bot-{index}"),
            token: String::new(),
            secret: String::new(),
            enabled: true,
            receive_all,
            recipients,
        }
    }

    fn recipient(phone: &str, always_at: bool, keywords: &[&str]) -> Recipient {
        Recipient {
            phone: phone.to_string(),
            always_at,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let robots = vec![robot(
            0,
            false,
            vec![
                recipient("13800000000", false, &["RTX 4090"]),
                recipient("13900000000", false, &["macbook"]),
            ],
        )];

        let dispatches = route(&robots, "[Sale] rtx 4090 founders edition");
        assert_eq!(
            dispatches,
            vec![Dispatch {
                robot_index: 0,
                mentions: vec!["13800000000".to_string()],
            }]
        );
    }

    #[test]
    fn filtered_robot_stays_quiet_without_a_match() {
        let robots = vec![robot(
            0,
            false,
            vec![recipient("13800000000", true, &["4090"])],
        )];
        assert!(route(&robots, "used keyboard").is_empty());
    }

    #[test]
    fn receive_all_forwards_everything_and_keeps_keyword_mentions() {
        let robots = vec![robot(
            3,
            true,
            vec![
                recipient("13800000000", false, &["4090"]),
                recipient("13900000000", true, &[]),
                recipient("13700000000", false, &["macbook"]),
            ],
        )];

        let dispatch = robots[0].dispatch("selling a 4090").unwrap();
        assert_eq!(dispatch.robot_index, 3);
        assert_eq!(dispatch.mentions, ["13800000000", "13900000000"]);

        let dispatch = robots[0].dispatch("used keyboard").unwrap();
        assert_eq!(dispatch.mentions, ["13900000000"]);
    }

    #[test]
    fn disabled_robot_never_forwards() {
        let mut quiet = robot(0, true, vec![recipient("13800000000", true, &["4090"])]);
        quiet.enabled = false;
        assert!(quiet.dispatch("4090").is_none());
    }
}
