//! Directory entry to POSIX record mapping.
//!
//! Mapping is pure and never fails a fetch: entries that cannot produce a
//! valid record are dropped (and logged at debug level), and unparsable
//! optional fields fall back to their defaults. A value holding `:`, `\n`
//! or `\r` cannot be rendered as a flat line, so its record is dropped too.

use nss_model::{AccountRecord, GroupRecord, ShadowRecord};

use crate::config::AttributeMap;
use crate::dn::extract_attribute;
use crate::entry::DirectoryEntry;

/// Password scheme prefix some directories store in front of crypt hashes.
const CRYPT_SCHEME: &str = "{CRYPT}";

/// Maps raw entries to account, group and shadow records.
#[derive(Debug, Clone, Default)]
pub struct RecordMapper {
    attributes: AttributeMap,
}

impl RecordMapper {
    /// Creates a mapper for the given attribute names.
    #[must_use]
    pub const fn new(attributes: AttributeMap) -> Self {
        Self { attributes }
    }

    /// Returns the attribute names in use.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Maps account entries, dropping those with a missing, non-numeric or
    /// zero `uidNumber`/`gidNumber` or with a delimiter in a text field.
    #[must_use]
    pub fn map_accounts(&self, entries: &[DirectoryEntry]) -> Vec<AccountRecord> {
        entries
            .iter()
            .filter_map(|entry| self.map_account(entry))
            .collect()
    }

    /// Maps a single account entry.
    #[must_use]
    pub fn map_account(&self, entry: &DirectoryEntry) -> Option<AccountRecord> {
        let attrs = &self.attributes;
        let name = entry.get_attr(&attrs.login);

        let Some(uid) = parse_id(entry.get_attr(&attrs.uid_number)) else {
            tracing::debug!(name, dn = %entry.dn, "skipping account: invalid or zero uidNumber");
            return None;
        };
        let Some(gid) = parse_id(entry.get_attr(&attrs.gid_number)) else {
            tracing::debug!(name, dn = %entry.dn, "skipping account: invalid or zero gidNumber");
            return None;
        };

        let gecos = match entry.get_attr(&attrs.gecos) {
            "" => entry.get_attr(&attrs.common_name),
            gecos => gecos,
        };

        let record = AccountRecord::new(name, uid, gid)
            .with_gecos(gecos)
            .with_dir(entry.get_attr(&attrs.home_directory))
            .with_shell(entry.get_attr(&attrs.login_shell));

        if let Err(e) = record.validate() {
            tracing::debug!(dn = %entry.dn, error = %e, "skipping account: unsafe field");
            return None;
        }
        Some(record)
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// Maps group entries, dropping those with a missing, non-numeric or
    /// zero `gidNumber`.
    #[must_use]
    pub fn map_groups(&self, entries: &[DirectoryEntry]) -> Vec<GroupRecord> {
        entries
            .iter()
            .filter_map(|entry| self.map_group(entry))
            .collect()
    }

    /// Maps a single group entry.
    ///
    /// Members are the `memberUid` values followed by the login names found
    /// in `member` DNs. DNs that do not parse or carry no login component
    /// are skipped, as are names holding a delimiter.
    #[must_use]
    pub fn map_group(&self, entry: &DirectoryEntry) -> Option<GroupRecord> {
        let attrs = &self.attributes;
        let name = entry.get_attr(&attrs.common_name);

        let Some(gid) = parse_id(entry.get_attr(&attrs.gid_number)) else {
            tracing::debug!(name, dn = %entry.dn, "skipping group: invalid or zero gidNumber");
            return None;
        };

        let mut members: Vec<String> = entry.get_attrs(&attrs.member_uid).to_vec();
        members.extend(
            entry
                .get_attrs(&attrs.member)
                .iter()
                .filter_map(|dn| extract_attribute(dn, &attrs.login)),
        );

        members.retain(|member| {
            let valid = GroupRecord::is_valid_member(member);
            if !valid {
                tracing::debug!(group = name, member = ?member, "skipping unsafe group member");
            }
            valid
        });

        let record = GroupRecord::new(name, gid).with_members(members);
        if let Err(e) = record.validate() {
            tracing::debug!(dn = %entry.dn, error = %e, "skipping group: unsafe field");
            return None;
        }
        Some(record)
    }

    // ========================================================================
    // Shadow
    // ========================================================================

    /// Maps shadow entries. Only entries with a delimiter in the login or
    /// hash are dropped.
    #[must_use]
    pub fn map_shadow(&self, entries: &[DirectoryEntry]) -> Vec<ShadowRecord> {
        entries
            .iter()
            .filter_map(|entry| self.map_shadow_entry(entry))
            .collect()
    }

    /// Maps a single shadow entry, defaulting each field independently.
    #[must_use]
    pub fn map_shadow_entry(&self, entry: &DirectoryEntry) -> Option<ShadowRecord> {
        let attrs = &self.attributes;
        let field = |name: &str, default: i64| -> i64 {
            entry.get_attr(name).parse().unwrap_or(default)
        };

        let mut record = ShadowRecord::new(entry.get_attr(&attrs.login));
        if let Some(hash) = password_hash(&entry.get_attr_lossy(&attrs.user_password)) {
            record.passwd = hash;
        }
        record.last_change = field(&attrs.shadow_last_change, ShadowRecord::DEFAULT_LAST_CHANGE);
        record.min_age = field(&attrs.shadow_min, ShadowRecord::DEFAULT_MIN_AGE);
        record.max_age = field(&attrs.shadow_max, ShadowRecord::DEFAULT_MAX_AGE);
        record.warning = field(&attrs.shadow_warning, ShadowRecord::DEFAULT_WARNING);
        record.inactive = field(&attrs.shadow_inactive, ShadowRecord::UNSET);
        record.expire = field(&attrs.shadow_expire, ShadowRecord::UNSET);
        record.flag = field(&attrs.shadow_flag, ShadowRecord::UNSET);

        if let Err(e) = record.validate() {
            tracing::debug!(dn = %entry.dn, error = %e, "skipping shadow entry: unsafe field");
            return None;
        }
        Some(record)
    }
}

/// Parses a non-zero decimal id.
fn parse_id(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|id| *id != 0)
}

/// Strips the `{CRYPT}` scheme tag; `None` when no hash remains.
fn password_hash(raw: &str) -> Option<String> {
    let hash = match raw.get(..CRYPT_SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(CRYPT_SCHEME) => &raw[CRYPT_SCHEME.len()..],
        _ => raw,
    };
    (!hash.is_empty()).then(|| hash.to_string())
}
