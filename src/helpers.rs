//! 대화 도우미 콘텐츠 뱅크
//!
//! 세션 안에서는 같은 항목을 반복하지 않는다. 카테고리가 소진되면
//! None을 돌려주고 코디네이터가 HelperUnavailable로 알린다.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 도우미 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperCategory {
    Icebreaker,
    WouldYouRather,
    Topic,
}

/// 도우미 콘텐츠. 양자택일 질문만 구조가 다르다
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HelperContent {
    Text(String),
    Either { option1: String, option2: String },
}

/// 고정 콘텐츠 뱅크
pub struct HelperBank {
    ice_breakers: Vec<&'static str>,
    would_you_rather: Vec<(&'static str, &'static str)>,
    topics: Vec<&'static str>,
}

impl HelperBank {
    pub fn builtin() -> Self {
        Self {
            ice_breakers: vec![
                "What's the most spontaneous thing you've ever done?",
                "If you could have dinner with anyone, dead or alive, who would it be?",
                "What's your hidden talent?",
                "What's the best advice you've ever received?",
                "If you could live anywhere in the world, where would it be?",
                "What's your favorite way to spend a weekend?",
                "What's something you've always wanted to try?",
                "What's your go-to karaoke song?",
                "If you won the lottery tomorrow, what's the first thing you'd do?",
                "What's the most interesting place you've traveled to?",
                "What's your favorite childhood memory?",
                "If you could master any skill instantly, what would it be?",
                "What's your ideal vacation?",
                "What's the last book you read?",
                "Do you have any pets? Tell me about them!",
                "What's your favorite type of music?",
                "Are you a morning person or a night owl?",
                "What's your favorite season and why?",
                "What's the best concert you've been to?",
                "What's your dream job?",
            ],
            would_you_rather: vec![
                ("have the ability to fly", "be invisible"),
                ("live in the city", "live in the countryside"),
                (
                    "be able to speak all languages",
                    "be able to play all instruments",
                ),
                ("travel to the past", "travel to the future"),
                ("have unlimited money", "have unlimited time"),
                ("be famous", "be anonymous but wealthy"),
                ("always be 10 minutes late", "always be 20 minutes early"),
                (
                    "have a rewind button for life",
                    "have a pause button for life",
                ),
                ("live without internet", "live without AC/heating"),
                ("be able to read minds", "be able to see the future"),
                ("work from home forever", "travel for work constantly"),
                ("have a personal chef", "have a personal trainer"),
                ("live on the beach", "live in the mountains"),
                (
                    "never use social media again",
                    "never watch TV/movies again",
                ),
                ("be the funniest person", "be the smartest person"),
            ],
            topics: vec![
                "Travel adventures",
                "Favorite foods",
                "Dream destinations",
                "Hobbies and interests",
                "Career goals",
                "Favorite movies/TV shows",
                "Music preferences",
                "Weekend activities",
                "Childhood memories",
                "Future plans",
                "Pet peeves",
                "Bucket list items",
                "Favorite books",
                "Sports and fitness",
                "Cooking skills",
                "Technology",
                "Art and creativity",
                "Family traditions",
                "Life goals",
                "Funny stories",
            ],
        }
    }

    pub fn len(&self, category: HelperCategory) -> usize {
        match category {
            HelperCategory::Icebreaker => self.ice_breakers.len(),
            HelperCategory::WouldYouRather => self.would_you_rather.len(),
            HelperCategory::Topic => self.topics.len(),
        }
    }

    /// used에 없는 인덱스 중 무작위 한 건. 소진이면 None
    pub fn draw(
        &self,
        category: HelperCategory,
        used: &mut HashSet<usize>,
    ) -> Option<HelperContent> {
        let unused: Vec<usize> = (0..self.len(category))
            .filter(|i| !used.contains(i))
            .collect();
        let index = *unused.choose(&mut rand::thread_rng())?;
        used.insert(index);

        Some(match category {
            HelperCategory::Icebreaker => HelperContent::Text(self.ice_breakers[index].to_string()),
            HelperCategory::WouldYouRather => {
                let (option1, option2) = self.would_you_rather[index];
                HelperContent::Either {
                    option1: option1.to_string(),
                    option2: option2.to_string(),
                }
            }
            HelperCategory::Topic => HelperContent::Text(self.topics[index].to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_are_unique_until_exhaustion() {
        let bank = HelperBank::builtin();
        let total = bank.len(HelperCategory::Topic);
        let mut used = HashSet::new();
        let mut seen = HashSet::new();

        for _ in 0..total {
            let item = bank.draw(HelperCategory::Topic, &mut used).unwrap();
            let HelperContent::Text(text) = item else {
                panic!("topic bank yields text content");
            };
            assert!(seen.insert(text));
        }

        // 소진 후에는 침묵이 아니라 None
        assert!(bank.draw(HelperCategory::Topic, &mut used).is_none());
    }

    #[test]
    fn would_you_rather_has_two_options() {
        let bank = HelperBank::builtin();
        let mut used = HashSet::new();
        let item = bank.draw(HelperCategory::WouldYouRather, &mut used).unwrap();
        assert!(matches!(item, HelperContent::Either { .. }));
    }
}
