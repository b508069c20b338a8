use std::sync::Arc;

use dcmlens_crypto::ContentHasher;
use dcmlens_dataset::{parse_tag, resolve, DatasetParser};
use dcmlens_render::{headers_for, render, FixedHeaders};
use dcmlens_store::{BlobStore, DedupIndex};
use dcmlens_types::FileId;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::locks::StripedLocks;
use crate::upload::{RawUpload, TagData, UploadOutcome, UploadResponse};

/// Where an upload's bytes ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ingested {
    pub file_id: FileId,
    pub is_duplicate: bool,
}

/// The upload pipeline: dedup, storage, validation, tag extraction and
/// preview rendering.
///
/// Every operation is blocking; async callers should run it on a blocking
/// thread.
pub struct UploadService {
    blobs: Arc<dyn BlobStore>,
    index: Arc<dyn DedupIndex>,
    parser: Arc<dyn DatasetParser>,
    hasher: ContentHasher,
    locks: StripedLocks,
}

impl UploadService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        index: Arc<dyn DedupIndex>,
        parser: Arc<dyn DatasetParser>,
    ) -> Self {
        Self {
            blobs,
            index,
            parser,
            hasher: ContentHasher::UPLOAD,
            locks: StripedLocks::default(),
        }
    }

    // ---- Uploads ----

    /// Store (or find) the upload, then answer for `tag`.
    ///
    /// The file is stored and indexed before the tag is looked at, so a
    /// valid file with a bad tag is still kept.
    pub fn process_upload(&self, upload: RawUpload, tag: &str) -> ServiceResult<UploadOutcome> {
        let ingested = self.ingest(&upload.bytes)?;

        let mut response = UploadResponse::new(ingested.file_id);
        response.filename = upload.filename;
        response.is_duplicate = Some(ingested.is_duplicate);

        self.extract(ingested.file_id, &upload.bytes, tag, response)
    }

    /// Deduplicate and store raw bytes.
    ///
    /// A known digest whose file is still present is reused without
    /// validation. Anything else is written under a new id, validated, and
    /// only then recorded in the index; invalid bytes are removed again.
    pub fn ingest(&self, bytes: &[u8]) -> ServiceResult<Ingested> {
        let digest = self.hasher.digest(bytes);
        let _guard = self.locks.lock(&digest);

        if let Some(existing) = self.index.lookup(&digest)? {
            if self.blobs.exists(&existing)? {
                info!(file_id = %existing, digest = %digest.short_hex(), "duplicate upload");
                return Ok(Ingested {
                    file_id: existing,
                    is_duplicate: true,
                });
            }
            warn!(
                file_id = %existing,
                digest = %digest.short_hex(),
                "indexed file missing from storage, storing again"
            );
        }

        let file_id = FileId::generate();
        self.blobs.write(&file_id, bytes)?;

        if !self.parser.validate(bytes) {
            self.blobs.delete(&file_id)?;
            info!(digest = %digest.short_hex(), size = bytes.len(), "rejected invalid upload");
            return Err(ServiceError::InvalidFormat);
        }

        self.index.record(digest, file_id)?;
        info!(
            file_id = %file_id,
            digest = %digest.short_hex(),
            size = bytes.len(),
            "stored new upload"
        );
        Ok(Ingested {
            file_id,
            is_duplicate: false,
        })
    }

    // ---- Random picks ----

    /// Answer for `tag` from a uniformly random stored file.
    pub fn process_random(&self, tag: &str) -> ServiceResult<UploadOutcome> {
        let ids = self.blobs.list()?;
        let file_id = *ids
            .choose(&mut rand::thread_rng())
            .ok_or(ServiceError::NoStoredFiles)?;
        let bytes = self.blobs.read(&file_id)?.ok_or_else(|| {
            ServiceError::Internal(format!("stored file {file_id} disappeared"))
        })?;
        debug!(file_id = %file_id, stored = ids.len(), "picked random file");

        self.extract(file_id, &bytes, tag, UploadResponse::new(file_id))
    }

    // ---- Shared tail ----

    fn extract(
        &self,
        file_id: FileId,
        bytes: &[u8],
        tag: &str,
        mut response: UploadResponse,
    ) -> ServiceResult<UploadOutcome> {
        let dataset = self
            .parser
            .parse(bytes)
            .map_err(|source| ServiceError::Parse { file_id, source })?;

        let requested = parse_tag(tag)?;
        let element = resolve(&dataset, requested)
            .ok_or_else(|| ServiceError::TagNotFound(tag.trim().to_string()))?;
        let tag_data = TagData::from(element);

        match render(&dataset) {
            Ok(image) => {
                let headers = headers_for(
                    &dataset,
                    FixedHeaders {
                        file_id,
                        tag: element.tag,
                        keyword: tag_data.keyword,
                        vr: tag_data.vr,
                    },
                );
                debug!(file_id = %file_id, width = image.width, height = image.height, "rendered preview");
                Ok(UploadOutcome::Image {
                    png: image.png,
                    headers,
                })
            }
            Err(e) => {
                debug!(file_id = %file_id, error = %e, "no preview");
                response.tag_data = Some(tag_data);
                response.png_error = Some(e.to_string());
                Ok(UploadOutcome::Metadata(response))
            }
        }
    }

    // ---- Accessors ----

    pub fn stored_count(&self) -> ServiceResult<usize> {
        Ok(self.blobs.list()?.len())
    }

    pub fn indexed_count(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmlens_dataset::DicomParser;
    use dcmlens_store::{InMemoryBlobStore, InMemoryDedupIndex};
    use dicom_core::value::PrimitiveValue;
    use dicom_core::{DataElement, VR};
    use dicom_dictionary_std::tags;
    use dicom_object::meta::FileMetaTableBuilder;
    use dicom_object::InMemDicomObject;

    const SECONDARY_CAPTURE: &str = "1.2.840.10008.5.1.4.1.1.7";

    fn dicom_bytes(patient: &str, pixels: Option<[u8; 4]>) -> Vec<u8> {
        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(SECONDARY_CAPTURE)));
        obj.put(DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("1.2.3.4")));
        obj.put(DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("OT")));
        obj.put(DataElement::new(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from(patient)));
        if let Some(pixels) = pixels {
            for (tag, value) in [
                (tags::ROWS, 2_u16),
                (tags::COLUMNS, 2),
                (tags::SAMPLES_PER_PIXEL, 1),
                (tags::BITS_ALLOCATED, 8),
                (tags::BITS_STORED, 8),
                (tags::HIGH_BIT, 7),
                (tags::PIXEL_REPRESENTATION, 0),
            ] {
                obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
            }
            obj.put(DataElement::new(
                tags::PHOTOMETRIC_INTERPRETATION,
                VR::CS,
                PrimitiveValue::from("MONOCHROME2"),
            ));
            obj.put(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(pixels.to_vec())));
        }
        let file = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .media_storage_sop_class_uid(SECONDARY_CAPTURE)
                    .media_storage_sop_instance_uid("1.2.3.4")
                    .transfer_syntax("1.2.840.10008.1.2.1"),
            )
            .unwrap();
        let mut buf = Vec::new();
        file.write_all(&mut buf).unwrap();
        buf
    }

    struct Harness {
        blobs: Arc<InMemoryBlobStore>,
        index: Arc<InMemoryDedupIndex>,
        service: UploadService,
    }

    fn harness() -> Harness {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let index = Arc::new(InMemoryDedupIndex::new());
        let service = UploadService::new(blobs.clone(), index.clone(), Arc::new(DicomParser));
        Harness { blobs, index, service }
    }

    fn metadata(outcome: UploadOutcome) -> UploadResponse {
        match outcome {
            UploadOutcome::Metadata(response) => response,
            UploadOutcome::Image { .. } => panic!("expected metadata outcome"),
        }
    }

    // ----------------------------------------------------------------------
    // Dedup and storage
    // ----------------------------------------------------------------------

    #[test]
    fn same_bytes_twice_is_duplicate() {
        let h = harness();
        let bytes = dicom_bytes("Doe^Jane", None);

        let first = metadata(h.service.process_upload(RawUpload::new(bytes.clone()), "0010,0010").unwrap());
        let second = metadata(h.service.process_upload(RawUpload::new(bytes), "0010,0010").unwrap());

        assert_eq!(first.file_id, second.file_id);
        assert_eq!(first.is_duplicate, Some(false));
        assert_eq!(second.is_duplicate, Some(true));
        assert_eq!(h.blobs.len(), 1);
        assert_eq!(h.index.len(), 1);
    }

    #[test]
    fn different_bytes_get_different_ids() {
        let h = harness();
        let a = h.service.ingest(&dicom_bytes("A^A", None)).unwrap();
        let b = h.service.ingest(&dicom_bytes("B^B", None)).unwrap();
        assert_ne!(a.file_id, b.file_id);
        assert_eq!(h.service.stored_count().unwrap(), 2);
        assert_eq!(h.service.indexed_count(), 2);
    }

    #[test]
    fn invalid_upload_leaves_nothing_behind() {
        let h = harness();
        let err = h
            .service
            .process_upload(RawUpload::new(b"definitely not dicom".to_vec()), "0010,0010")
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidFormat));
        assert!(h.blobs.is_empty());
        assert!(h.index.is_empty());
    }

    #[test]
    fn stale_index_entry_is_replaced() {
        let h = harness();
        let bytes = dicom_bytes("Doe^Jane", None);
        let first = h.service.ingest(&bytes).unwrap();
        assert!(h.blobs.delete(&first.file_id).unwrap());

        let second = h.service.ingest(&bytes).unwrap();
        assert!(!second.is_duplicate);
        assert_ne!(second.file_id, first.file_id);

        let third = h.service.ingest(&bytes).unwrap();
        assert!(third.is_duplicate);
        assert_eq!(third.file_id, second.file_id);
    }

    #[test]
    fn concurrent_identical_uploads_store_once() {
        let h = harness();
        let bytes = dicom_bytes("Doe^Jane", None);
        let ids: Vec<FileId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| h.service.ingest(&bytes).unwrap().file_id))
                .collect();
            handles.into_iter().map(|t| t.join().unwrap()).collect()
        });
        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(h.blobs.len(), 1);
    }

    // ----------------------------------------------------------------------
    // Tag extraction
    // ----------------------------------------------------------------------

    #[test]
    fn invalid_tag_still_stores_file() {
        let h = harness();
        let err = h
            .service
            .process_upload(RawUpload::new(dicom_bytes("Doe^Jane", None)), "zzzz,0010")
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTagFormat(_)));
        assert_eq!(h.blobs.len(), 1);
        assert_eq!(h.index.len(), 1);
    }

    #[test]
    fn missing_tag_is_not_found() {
        let h = harness();
        let err = h
            .service
            .process_upload(RawUpload::new(dicom_bytes("Doe^Jane", None)), "0011,0011")
            .unwrap_err();
        assert!(matches!(err, ServiceError::TagNotFound(ref t) if t == "0011,0011"));
    }

    #[test]
    fn metadata_response_without_pixels() {
        let h = harness();
        let upload = RawUpload::new(dicom_bytes("Doe^Jane", None)).with_filename("scan.dcm");
        let response = metadata(h.service.process_upload(upload, "0010,0010").unwrap());

        assert!(response.success);
        assert_eq!(response.filename.as_deref(), Some("scan.dcm"));
        assert_eq!(
            response.png_error.as_deref(),
            Some("DICOM file does not contain image data")
        );
        let tag_data = response.tag_data.unwrap();
        assert_eq!(tag_data.tag, "(0010,0010)");
        assert_eq!(tag_data.keyword, "PatientName");
        assert_eq!(tag_data.vr, "PN");
    }

    #[test]
    fn file_meta_tag_resolves() {
        let h = harness();
        let response = metadata(
            h.service
                .process_upload(RawUpload::new(dicom_bytes("Doe^Jane", None)), "0002,0010")
                .unwrap(),
        );
        let tag_data = response.tag_data.unwrap();
        assert_eq!(tag_data.keyword, "TransferSyntaxUID");
        assert_eq!(tag_data.vr, "UI");
    }

    #[test]
    fn image_outcome_with_headers() {
        let h = harness();
        let outcome = h
            .service
            .process_upload(RawUpload::new(dicom_bytes("Doe^Jane", Some([0, 50, 100, 200]))), "0010,0010")
            .unwrap();
        let UploadOutcome::Image { png, headers } = outcome else {
            panic!("expected image outcome");
        };
        assert!(png.starts_with(b"\x89PNG"));
        let id = h.blobs.list().unwrap()[0];
        assert_eq!(headers["X-DICOM-ID"], id.to_string());
        assert_eq!(headers["X-Tag"], "(0010,0010)");
        assert_eq!(headers["X-Keyword"], "PatientName");
        assert_eq!(headers["X-VR"], "PN");
        assert_eq!(headers["X-DICOM-Modality"], "OT");
        assert_eq!(headers["X-DICOM-Rows"], "2");
        assert!(!headers.contains_key("X-DICOM-PatientName"));
    }

    // ----------------------------------------------------------------------
    // Random picks
    // ----------------------------------------------------------------------

    #[test]
    fn random_on_empty_store() {
        let h = harness();
        assert!(matches!(
            h.service.process_random("0010,0010"),
            Err(ServiceError::NoStoredFiles)
        ));
    }

    #[test]
    fn random_pick_omits_upload_fields() {
        let h = harness();
        let stored = h.service.ingest(&dicom_bytes("Doe^Jane", None)).unwrap();
        let response = metadata(h.service.process_random("0010,0010").unwrap());
        assert_eq!(response.file_id, stored.file_id);
        assert_eq!(response.filename, None);
        assert_eq!(response.is_duplicate, None);
        assert!(response.tag_data.is_some());
    }
}
