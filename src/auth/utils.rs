use crate::{
    auth::claims::{Claims, UserRole},
    models::domain::{Quiz, QuizAttempt},
    models::dto::views::AttemptViewer,
};

pub fn is_admin(claims: &Claims) -> bool {
    claims.role == UserRole::Admin
}

/// How `claims` may see `attempt`, or `None` if not at all. Staff rights win
/// when the requester is also the owner.
pub fn attempt_viewer(claims: &Claims, attempt: &QuizAttempt, quiz: &Quiz) -> Option<AttemptViewer> {
    if is_admin(claims) || quiz.created_by == claims.sub {
        Some(AttemptViewer::Staff)
    } else if attempt.user_id == claims.sub {
        Some(AttemptViewer::Owner)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_claims(user_id: &str, role: UserRole) -> Claims {
        Claims {
            sub: user_id.to_string(),
            role,
            iat: 0,
            exp: 9999999999,
        }
    }

    fn fixtures() -> (Quiz, QuizAttempt) {
        let quiz = Quiz::new("lecturer-1", "Quiz", 10, 1, 50, vec![]);
        let attempt = QuizAttempt::start("student-1", &quiz.id, 1, Utc::now());
        (quiz, attempt)
    }

    #[test]
    fn owner_gets_owner_view() {
        let (quiz, attempt) = fixtures();
        let claims = create_test_claims("student-1", UserRole::Student);
        assert_eq!(attempt_viewer(&claims, &attempt, &quiz), Some(AttemptViewer::Owner));
    }

    #[test]
    fn quiz_lecturer_and_admin_get_staff_view() {
        let (quiz, attempt) = fixtures();

        let lecturer = create_test_claims("lecturer-1", UserRole::Lecturer);
        assert_eq!(attempt_viewer(&lecturer, &attempt, &quiz), Some(AttemptViewer::Staff));

        let admin = create_test_claims("admin-1", UserRole::Admin);
        assert_eq!(attempt_viewer(&admin, &attempt, &quiz), Some(AttemptViewer::Staff));
    }

    #[test]
    fn other_users_get_nothing() {
        let (quiz, attempt) = fixtures();

        let stranger = create_test_claims("student-2", UserRole::Student);
        assert_eq!(attempt_viewer(&stranger, &attempt, &quiz), None);

        let other_lecturer = create_test_claims("lecturer-2", UserRole::Lecturer);
        assert_eq!(attempt_viewer(&other_lecturer, &attempt, &quiz), None);
    }
}
