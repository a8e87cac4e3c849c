use shared::domain::{Direction, Notification, NotificationKind};
use wizard_core::{Notifier, WizardController};

/// Prints notifications to stderr so stdout stays machine-readable.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let tag = match notification.kind {
            NotificationKind::Info => "info",
            NotificationKind::Success => "ok",
            NotificationKind::Warning => "warn",
            NotificationKind::Error => "error",
        };
        eprintln!("[{tag}] {}: {}", notification.title, notification.message);
    }
}

/// One line listing every step, the current one in brackets. Right-to-left
/// locales list the steps from the right.
pub fn step_ribbon(wizard: &WizardController) -> String {
    let current = wizard.current_step();
    let labels: Vec<String> = wizard
        .profile()
        .steps
        .iter()
        .enumerate()
        .map(|(idx, kind)| ribbon_label(idx + 1, current, &wizard.step_title(*kind)))
        .collect();
    join_steps(labels, wizard.locale().direction())
}

fn ribbon_label(step: usize, current: usize, title: &str) -> String {
    if step == current {
        format!("[{step}. {title}]")
    } else {
        format!("{step}. {title}")
    }
}

fn join_steps(mut labels: Vec<String>, direction: Direction) -> String {
    match direction {
        Direction::Ltr => labels.join(" > "),
        Direction::Rtl => {
            labels.reverse();
            labels.join(" < ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtl_ribbon_reads_from_the_right() {
        let labels = vec![
            ribbon_label(1, 2, "A"),
            ribbon_label(2, 2, "B"),
            ribbon_label(3, 2, "C"),
        ];
        assert_eq!(join_steps(labels.clone(), Direction::Ltr), "1. A > [2. B] > 3. C");
        assert_eq!(join_steps(labels, Direction::Rtl), "3. C < [2. B] < 1. A");
    }
}
