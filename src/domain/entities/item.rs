use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::errors::DomainError;

/// Longitud máxima de un nombre, en caracteres
pub const MAX_NAME_LENGTH: usize = 255;

/// Caracteres que no pueden aparecer en un nombre
pub const FORBIDDEN_NAME_CHARS: [char; 8] = ['?', '*', ':', '|', '<', '>', '\\', '/'];

/// Error en la creación o manipulación de items
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("Name is required")]
    EmptyName,

    #[error("Name is too long (max 255 characters)")]
    NameTooLong,

    #[error("Name cannot contain these characters: ? * : | < > \\ /")]
    ForbiddenCharacter,

    #[error("File key is required for files")]
    MissingBlobKey,
}

pub type ItemResult<T> = Result<T, ItemError>;

impl From<ItemError> for DomainError {
    fn from(err: ItemError) -> Self {
        DomainError::validation_error("Item", err.to_string())
    }
}

/// Valida un nombre y devuelve la versión recortada
pub fn validate_name(raw: &str) -> ItemResult<String> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(ItemError::EmptyName);
    }
    if name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(ItemError::ForbiddenCharacter);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ItemError::NameTooLong);
    }

    Ok(name.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::File => "file",
            ItemKind::Folder => "folder",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "file" => Some(ItemKind::File),
            "folder" => Some(ItemKind::Folder),
            _ => None,
        }
    }
}

/// Metadata kept for a file; the bytes live in the blob store under `blob_key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    blob_key: String,
    mime_hint: Option<String>,
    size_bytes: Option<u64>,
}

impl FileContent {
    pub fn new(
        blob_key: String,
        mime_hint: Option<String>,
        size_bytes: Option<u64>,
    ) -> ItemResult<Self> {
        if blob_key.trim().is_empty() {
            return Err(ItemError::MissingBlobKey);
        }

        Ok(Self {
            blob_key,
            mime_hint: mime_hint.filter(|mime| !mime.trim().is_empty()),
            size_bytes,
        })
    }

    pub fn blob_key(&self) -> &str {
        &self.blob_key
    }

    pub fn mime_hint(&self) -> Option<&str> {
        self.mime_hint.as_deref()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }
}

/// What an item is. Neither the variant nor the file content ever changes
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemContent {
    File(FileContent),
    Folder,
}

/// A node of a user's drive: a file or a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    id: Uuid,
    name: String,
    content: ItemContent,
    parent_id: Option<Uuid>,
    owner_id: Uuid,
    is_starred: bool,
    is_trashed: bool,
    trashed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Item {
    /// Crea un nuevo item activo con validación del nombre
    pub fn new(
        owner_id: Uuid,
        name: &str,
        content: ItemContent,
        parent_id: Option<Uuid>,
    ) -> ItemResult<Self> {
        let name = validate_name(name)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            content,
            parent_id,
            owner_id,
            is_starred: false,
            is_trashed: false,
            trashed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn new_folder(owner_id: Uuid, name: &str, parent_id: Option<Uuid>) -> ItemResult<Self> {
        Self::new(owner_id, name, ItemContent::Folder, parent_id)
    }

    pub fn new_file(
        owner_id: Uuid,
        name: &str,
        file: FileContent,
        parent_id: Option<Uuid>,
    ) -> ItemResult<Self> {
        Self::new(owner_id, name, ItemContent::File(file), parent_id)
    }

    /// Reconstruye un item desde almacenamiento (sin validación)
    #[allow(clippy::too_many_arguments)]
    pub fn from_record(
        id: Uuid,
        name: String,
        content: ItemContent,
        parent_id: Option<Uuid>,
        owner_id: Uuid,
        is_starred: bool,
        is_trashed: bool,
        trashed_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            content,
            parent_id,
            owner_id,
            is_starred,
            is_trashed,
            trashed_at,
            created_at,
            updated_at,
        }
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &ItemContent {
        &self.content
    }

    pub fn kind(&self) -> ItemKind {
        match self.content {
            ItemContent::File(_) => ItemKind::File,
            ItemContent::Folder => ItemKind::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.content, ItemContent::Folder)
    }

    pub fn file(&self) -> Option<&FileContent> {
        match &self.content {
            ItemContent::File(file) => Some(file),
            ItemContent::Folder => None,
        }
    }

    pub fn blob_key(&self) -> Option<&str> {
        self.file().map(FileContent::blob_key)
    }

    pub fn mime_hint(&self) -> Option<&str> {
        self.file().and_then(FileContent::mime_hint)
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.file().and_then(FileContent::size_bytes)
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn is_owned_by(&self, user_id: &Uuid) -> bool {
        self.owner_id == *user_id
    }

    pub fn is_starred(&self) -> bool {
        self.is_starred
    }

    pub fn is_trashed(&self) -> bool {
        self.is_trashed
    }

    pub fn trashed_at(&self) -> Option<DateTime<Utc>> {
        self.trashed_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Métodos para crear nuevas versiones del item (inmutable)

    /// Nueva versión con el nombre cambiado. `name` ya viene de `validate_name`.
    pub fn renamed(&self, name: String, at: DateTime<Utc>) -> Self {
        Self {
            name,
            updated_at: at,
            ..self.clone()
        }
    }

    pub fn with_star_toggled(&self, at: DateTime<Utc>) -> Self {
        Self {
            is_starred: !self.is_starred,
            updated_at: at,
            ..self.clone()
        }
    }

    /// Marks the item trashed. Only meaningful on an active item; the
    /// repositories check the current state before calling it.
    pub fn trashed(&self, at: DateTime<Utc>) -> Self {
        Self {
            is_trashed: true,
            trashed_at: Some(at),
            updated_at: at,
            ..self.clone()
        }
    }

    /// Back to active. `detach` moves the item to the root.
    pub fn restored(&self, detach: bool, at: DateTime<Utc>) -> Self {
        Self {
            is_trashed: false,
            trashed_at: None,
            parent_id: if detach { None } else { self.parent_id },
            updated_at: at,
            ..self.clone()
        }
    }
}
