use crate::error::PermissionError;
use crate::models::Principal;

/// 批量更新出荷状况: 需已确认邮箱、特权角色以及写权限
pub fn authorize_reconcile(
    principal: &Principal,
    privileged_roles: &[String],
) -> Result<(), PermissionError> {
    require_confirmed(principal)?;
    if !privileged_roles.iter().any(|r| r == &principal.role) {
        return Err(PermissionError::RoleNotAllowed(principal.role.clone()));
    }
    if !principal.can_write {
        return Err(PermissionError::WriteDenied(principal.email.clone()));
    }
    Ok(())
}

/// 只读页面: 需已确认邮箱和读权限
pub fn authorize_read(principal: &Principal) -> Result<(), PermissionError> {
    require_confirmed(principal)?;
    if !principal.can_read {
        return Err(PermissionError::ReadDenied(principal.email.clone()));
    }
    Ok(())
}

/// 登记类页面的写入: 在读权限之上还需写权限
pub fn authorize_write(principal: &Principal) -> Result<(), PermissionError> {
    authorize_read(principal)?;
    if !principal.can_write {
        return Err(PermissionError::WriteDenied(principal.email.clone()));
    }
    Ok(())
}

fn require_confirmed(principal: &Principal) -> Result<(), PermissionError> {
    if principal.email_confirmed_at.is_none() {
        return Err(PermissionError::EmailNotConfirmed(principal.email.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::principal;

    fn roles() -> Vec<String> {
        vec!["nagatsu".to_string(), "admin".to_string()]
    }

    #[test]
    fn privileged_writer_may_reconcile() {
        assert_eq!(authorize_reconcile(&principal("a@x", "admin", true, true), &roles()), Ok(()));
    }

    #[test]
    fn other_roles_are_refused() {
        let err = authorize_reconcile(&principal("a@x", "linde", true, true), &roles()).unwrap_err();
        assert_eq!(err, PermissionError::RoleNotAllowed("linde".to_string()));
    }

    #[test]
    fn writing_needs_read_and_write() {
        assert_eq!(authorize_write(&principal("a@x", "linde", true, true)), Ok(()));
        assert_eq!(
            authorize_write(&principal("a@x", "linde", true, false)),
            Err(PermissionError::WriteDenied("a@x".to_string()))
        );
        assert_eq!(
            authorize_write(&principal("a@x", "linde", false, true)),
            Err(PermissionError::ReadDenied("a@x".to_string()))
        );
    }

    #[test]
    fn write_flag_is_required() {
        let err = authorize_reconcile(&principal("a@x", "nagatsu", true, false), &roles()).unwrap_err();
        assert_eq!(err, PermissionError::WriteDenied("a@x".to_string()));
    }

    #[test]
    fn unconfirmed_email_is_refused() {
        let mut p = principal("a@x", "admin", true, true);
        p.email_confirmed_at = None;
        assert!(matches!(
            authorize_reconcile(&p, &roles()),
            Err(PermissionError::EmailNotConfirmed(_))
        ));
        assert!(matches!(authorize_read(&p), Err(PermissionError::EmailNotConfirmed(_))));
    }

    #[test]
    fn read_needs_read_flag() {
        assert!(authorize_read(&principal("a@x", "guest", true, false)).is_ok());
        assert_eq!(
            authorize_read(&principal("a@x", "guest", false, false)),
            Err(PermissionError::ReadDenied("a@x".to_string()))
        );
    }
}
