//! Status buckets and card moves between them.

use crate::model::{Task, TaskStatus};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Upcoming,
    Ongoing,
    Failure,
    Success,
}

impl Bucket {
    /// Display order of the board columns.
    pub const ALL: [Bucket; 4] = [
        Bucket::Upcoming,
        Bucket::Ongoing,
        Bucket::Failure,
        Bucket::Success,
    ];

    /// Drop-zone identifier.
    pub fn id(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Failure => "failure",
            Self::Success => "success",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Upcoming => "Upcoming Tasks",
            Self::Ongoing => "Ongoing Tasks",
            Self::Failure => "Failed Tasks",
            Self::Success => "Success Tasks",
        }
    }

    /// Status a card takes when dropped here.
    pub fn status(self) -> TaskStatus {
        match self {
            Self::Upcoming => TaskStatus::Upcoming,
            Self::Ongoing => TaskStatus::Ongoing,
            Self::Failure => TaskStatus::Failed,
            Self::Success => TaskStatus::Successful,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|bucket| bucket.id() == id)
    }

    pub fn index(self) -> usize {
        match self {
            Self::Upcoming => 0,
            Self::Ongoing => 1,
            Self::Failure => 2,
            Self::Success => 3,
        }
    }

    pub fn contains(self, task: &Task, now: OffsetDateTime) -> bool {
        match self {
            Self::Upcoming => {
                task.status == TaskStatus::Upcoming
                    && start_time(task).is_some_and(|start| start > now)
            }
            Self::Ongoing => {
                task.status == TaskStatus::Ongoing
                    && start_time(task).is_some_and(|start| start <= now)
            }
            Self::Failure => task.status == TaskStatus::Failed,
            Self::Success => task.status == TaskStatus::Successful,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Bucket {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::from_id(&normalized)
            .or_else(|| match normalized.as_str() {
                "failed" => Some(Self::Failure),
                "successful" | "done" => Some(Self::Success),
                _ => None,
            })
            .ok_or_else(|| {
                format!(
                    "unknown bucket '{}' (expected upcoming, ongoing, failure or success)",
                    raw.trim()
                )
            })
    }
}

fn start_time(task: &Task) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(&task.start_time, &Rfc3339).ok()
}

/// The bucket a task is shown in, if any. An upcoming task whose start time
/// has passed (or an ongoing one that has not started yet) is in none.
pub fn bucket_of(task: &Task, now: OffsetDateTime) -> Option<Bucket> {
    Bucket::ALL
        .into_iter()
        .find(|bucket| bucket.contains(task, now))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    columns: [Vec<Task>; 4],
}

impl Board {
    pub fn column(&self, bucket: Bucket) -> &[Task] {
        &self.columns[bucket.index()]
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits `tasks` into the four columns, keeping list order within each.
pub fn categorize(tasks: &[Task], now: OffsetDateTime) -> Board {
    let mut board = Board::default();
    for task in tasks {
        if let Some(bucket) = bucket_of(task, now) {
            board.columns[bucket.index()].push(task.clone());
        }
    }
    board
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Status update implied by moving `task_id` from `source` to `destination`.
/// Returns `None` when nothing should be sent.
pub fn plan_move(
    tasks: &[Task],
    task_id: &str,
    source: Bucket,
    destination: Bucket,
) -> Option<StatusChange> {
    if source == destination {
        return None;
    }
    tasks.iter().find(|task| task.id == task_id)?;
    Some(StatusChange {
        task_id: task_id.to_string(),
        status: destination.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::{Bucket, StatusChange, bucket_of, categorize, plan_move};
    use crate::model::{Task, TaskStatus};
    use time::macros::datetime;

    fn task(id: &str, start_time: &str, status: TaskStatus) -> Task {
        Task {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("task {id}"),
            description: None,
            start_time: start_time.to_string(),
            deadline: "2030-01-01T00:00:00Z".to_string(),
            status,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn categorize_applies_time_and_status_rules() {
        let now = datetime!(2025-06-01 12:00 UTC);
        let tasks = vec![
            task("future-upcoming", "2025-06-02T00:00:00Z", TaskStatus::Upcoming),
            task("past-upcoming", "2025-05-01T00:00:00Z", TaskStatus::Upcoming),
            task("started-ongoing", "2025-06-01T12:00:00Z", TaskStatus::Ongoing),
            task("future-ongoing", "2025-07-01T00:00:00Z", TaskStatus::Ongoing),
            task("won", "2025-05-01T00:00:00Z", TaskStatus::Successful),
            task("lost", "2025-08-01T00:00:00Z", TaskStatus::Failed),
        ];

        let board = categorize(&tasks, now);

        let ids = |bucket| {
            board
                .column(bucket)
                .iter()
                .map(|t| t.id.as_str())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(Bucket::Upcoming), vec!["future-upcoming"]);
        assert_eq!(ids(Bucket::Ongoing), vec!["started-ongoing"]);
        assert_eq!(ids(Bucket::Success), vec!["won"]);
        assert_eq!(ids(Bucket::Failure), vec!["lost"]);
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn unparseable_start_time_is_in_no_time_bucket() {
        let now = datetime!(2025-06-01 12:00 UTC);
        let broken = task("broken", "tomorrow-ish", TaskStatus::Upcoming);

        assert_eq!(bucket_of(&broken, now), None);
    }

    #[test]
    fn drop_ids_round_trip_through_buckets() {
        for bucket in Bucket::ALL {
            assert_eq!(Bucket::from_id(bucket.id()), Some(bucket));
            assert_eq!(bucket.id().parse::<Bucket>(), Ok(bucket));
        }
        assert_eq!(Bucket::from_id("done"), None);
        assert_eq!("done".parse::<Bucket>(), Ok(Bucket::Success));
        assert!("archive".parse::<Bucket>().is_err());
    }

    #[test]
    fn bucket_statuses_match_wire_labels() {
        assert_eq!(Bucket::Upcoming.status().label(), "Upcoming Task");
        assert_eq!(Bucket::Ongoing.status().label(), "Ongoing Task");
        assert_eq!(Bucket::Failure.status().label(), "Failed Task");
        assert_eq!(Bucket::Success.status().label(), "Successful Task");
    }

    #[test]
    fn plan_move_between_buckets_targets_destination_status() {
        let tasks = vec![task("t1", "2030-01-01T00:00:00Z", TaskStatus::Upcoming)];

        let change = plan_move(&tasks, "t1", Bucket::Upcoming, Bucket::Ongoing);

        assert_eq!(
            change,
            Some(StatusChange {
                task_id: "t1".to_string(),
                status: TaskStatus::Ongoing,
            })
        );
    }

    #[test]
    fn plan_move_within_same_bucket_is_noop() {
        let tasks = vec![task("t1", "2030-01-01T00:00:00Z", TaskStatus::Upcoming)];

        assert_eq!(
            plan_move(&tasks, "t1", Bucket::Upcoming, Bucket::Upcoming),
            None
        );
    }

    #[test]
    fn plan_move_ignores_unknown_task() {
        let tasks = vec![task("t1", "2030-01-01T00:00:00Z", TaskStatus::Upcoming)];

        assert_eq!(
            plan_move(&tasks, "t2", Bucket::Upcoming, Bucket::Success),
            None
        );
    }
}
