use failure::Fail;

bitflags! {
    /// Permissions allow for a fine-grained control over what actions a given
    /// actor can take on publishable records.
    pub struct PermissionBits: i32 {
        /// Permission holder can publish drafts.
        const PUBLISH = 0x00000001;
        /// Permission holder can remove published records.
        const UNPUBLISH = 0x00000002;
        /// Permission holder can delete drafts.
        const DELETE = 0x00000004;
        /// Permission holder can clear pending deletion markers.
        const UNDELETE = 0x00000008;
    }
}

impl PermissionBits {
    /// Get set of all elevated permissions.
    #[inline]
    pub fn elevated() -> PermissionBits {
        PermissionBits::all()
    }

    /// Get set of all (non-elevated) permissions.
    #[inline]
    pub fn normal() -> PermissionBits {
        PermissionBits::empty()
    }

    /// Verify that all required permissions are present.
    ///
    /// This is the same check as `self.contains(permissions)`, but returns an
    /// error naming the missing bits.
    pub fn require(&self, permissions: PermissionBits)
    -> Result<(), RequirePermissionsError> {
        if self.contains(permissions) {
            Ok(())
        } else {
            Err(RequirePermissionsError(permissions - *self))
        }
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Missing required permissions: {:?}", _0)]
pub struct RequirePermissionsError(PermissionBits);
