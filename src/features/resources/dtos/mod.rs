mod resource_dto;

pub use resource_dto::{
    extension_for, is_mime_type_allowed, shorten_filename, stored_content_type, AdminResourceQueryParams, CreateLinkResourceDto,
    DeleteResourceResponseDto, FolderSummaryDto, ResourceFileDto, ResourceFilter,
    ResourceFolderGroup, ResourceQueryParams, ResourceResponseDto, ResourceUpload,
    SetPublishedDto, UpdateResourceDto, UploadResourceDto, ALLOWED_MIME_TYPES,
    MAX_RESOURCE_FILE_SIZE,
};
pub(crate) use resource_dto::{normalized_folder, trimmed};
