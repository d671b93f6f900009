//! Embedded RFC 7643 schema definitions.
//!
//! The registry bootstraps itself from these documents so the engine works
//! without any external schema files. User-supplied schemas are validated
//! against the meta-schema loaded here before they are accepted.

/// Common attributes shared by every resource: `id`, `externalId`, `meta`.
pub fn common_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Meta",
  "name": "Meta",
  "description": "Common attributes present on every SCIM resource",
  "attributes": [
    {
      "name": "id",
      "type": "string",
      "description": "Unique identifier assigned by the service provider",
      "caseExact": true,
      "mutability": "readOnly",
      "returned": "always",
      "uniqueness": "server"
    },
    {
      "name": "externalId",
      "type": "string",
      "description": "Identifier as defined by the provisioning client",
      "caseExact": true,
      "mutability": "readWrite",
      "returned": "default"
    },
    {
      "name": "meta",
      "type": "complex",
      "description": "Resource metadata maintained by the service provider",
      "mutability": "readOnly",
      "returned": "default",
      "subAttributes": [
        {
          "name": "resourceType",
          "type": "string",
          "description": "Name of the resource type of the resource",
          "caseExact": true,
          "mutability": "readOnly"
        },
        {
          "name": "created",
          "type": "dateTime",
          "description": "Instant the resource was added",
          "mutability": "readOnly"
        },
        {
          "name": "lastModified",
          "type": "dateTime",
          "description": "Instant the resource was last updated",
          "mutability": "readOnly"
        },
        {
          "name": "location",
          "type": "reference",
          "description": "URI of the resource being returned",
          "referenceTypes": ["uri"],
          "mutability": "readOnly"
        },
        {
          "name": "version",
          "type": "string",
          "description": "Version (entity tag) of the resource",
          "caseExact": true,
          "mutability": "readOnly"
        }
      ]
    }
  ]
}"#
}

/// The core User schema (RFC 7643 §4.1).
pub fn user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:User",
  "name": "User",
  "description": "User Account",
  "attributes": [
    {
      "name": "userName",
      "type": "string",
      "description": "Unique identifier for the user, used to authenticate",
      "required": true,
      "uniqueness": "server"
    },
    {
      "name": "name",
      "type": "complex",
      "description": "Components of the user's real name",
      "subAttributes": [
        {"name": "formatted", "type": "string", "description": "Full name for display"},
        {"name": "familyName", "type": "string", "description": "Family name"},
        {"name": "givenName", "type": "string", "description": "Given name"},
        {"name": "middleName", "type": "string", "description": "Middle name"},
        {"name": "honorificPrefix", "type": "string", "description": "Honorific prefix"},
        {"name": "honorificSuffix", "type": "string", "description": "Honorific suffix"}
      ]
    },
    {
      "name": "displayName",
      "type": "string",
      "description": "Name of the user, suitable for display"
    },
    {
      "name": "nickName",
      "type": "string",
      "description": "Casual way to address the user"
    },
    {
      "name": "profileUrl",
      "type": "reference",
      "description": "URI of the user's online profile",
      "referenceTypes": ["external"]
    },
    {
      "name": "title",
      "type": "string",
      "description": "User's title, such as Vice President"
    },
    {
      "name": "userType",
      "type": "string",
      "description": "Relationship between the organization and the user"
    },
    {
      "name": "preferredLanguage",
      "type": "string",
      "description": "Preferred written or spoken language"
    },
    {
      "name": "locale",
      "type": "string",
      "description": "Default location for localization purposes"
    },
    {
      "name": "timezone",
      "type": "string",
      "description": "Time zone in IANA database format"
    },
    {
      "name": "active",
      "type": "boolean",
      "description": "Administrative status of the user"
    },
    {
      "name": "password",
      "type": "string",
      "description": "Cleartext password, never returned",
      "mutability": "writeOnly",
      "returned": "never"
    },
    {
      "name": "emails",
      "type": "complex",
      "description": "Email addresses for the user",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string", "description": "Email address value"},
        {"name": "display", "type": "string", "description": "Display value"},
        {"name": "type", "type": "string", "description": "Email kind",
         "canonicalValues": ["work", "home", "other"]},
        {"name": "primary", "type": "boolean", "description": "Preferred address"}
      ]
    },
    {
      "name": "phoneNumbers",
      "type": "complex",
      "description": "Phone numbers for the user",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string", "description": "Phone number value"},
        {"name": "display", "type": "string", "description": "Display value"},
        {"name": "type", "type": "string", "description": "Phone number kind",
         "canonicalValues": ["work", "home", "mobile", "fax", "pager", "other"]},
        {"name": "primary", "type": "boolean", "description": "Preferred number"}
      ]
    },
    {
      "name": "ims",
      "type": "complex",
      "description": "Instant messaging addresses",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string", "description": "IM address value"},
        {"name": "display", "type": "string", "description": "Display value"},
        {"name": "type", "type": "string", "description": "IM service kind",
         "canonicalValues": ["aim", "gtalk", "icq", "xmpp", "msn", "skype", "qq", "yahoo"]},
        {"name": "primary", "type": "boolean", "description": "Preferred address"}
      ]
    },
    {
      "name": "photos",
      "type": "complex",
      "description": "URIs of photos of the user",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "reference", "description": "Photo URI",
         "referenceTypes": ["external"]},
        {"name": "display", "type": "string", "description": "Display value"},
        {"name": "type", "type": "string", "description": "Photo kind",
         "canonicalValues": ["photo", "thumbnail"]},
        {"name": "primary", "type": "boolean", "description": "Preferred photo"}
      ]
    },
    {
      "name": "addresses",
      "type": "complex",
      "description": "Physical mailing addresses",
      "multiValued": true,
      "subAttributes": [
        {"name": "formatted", "type": "string", "description": "Full address for display"},
        {"name": "streetAddress", "type": "string", "description": "Street address component"},
        {"name": "locality", "type": "string", "description": "City or locality"},
        {"name": "region", "type": "string", "description": "State or region"},
        {"name": "postalCode", "type": "string", "description": "Zip or postal code"},
        {"name": "country", "type": "string", "description": "Country name component"},
        {"name": "type", "type": "string", "description": "Address kind",
         "canonicalValues": ["work", "home", "other"]},
        {"name": "primary", "type": "boolean", "description": "Preferred address"}
      ]
    },
    {
      "name": "groups",
      "type": "complex",
      "description": "Groups to which the user belongs",
      "multiValued": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "value", "type": "string", "description": "Group id",
         "mutability": "readOnly"},
        {"name": "$ref", "type": "reference", "description": "URI of the group resource",
         "referenceTypes": ["User", "Group"], "mutability": "readOnly"},
        {"name": "display", "type": "string", "description": "Display value",
         "mutability": "readOnly"},
        {"name": "type", "type": "string", "description": "Membership kind",
         "canonicalValues": ["direct", "indirect"], "mutability": "readOnly"}
      ]
    },
    {
      "name": "entitlements",
      "type": "complex",
      "description": "Entitlements for the user",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string", "description": "Entitlement value"},
        {"name": "display", "type": "string", "description": "Display value"},
        {"name": "type", "type": "string", "description": "Entitlement kind"},
        {"name": "primary", "type": "boolean", "description": "Primary entitlement"}
      ]
    },
    {
      "name": "roles",
      "type": "complex",
      "description": "Roles for the user",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string", "description": "Role value"},
        {"name": "display", "type": "string", "description": "Display value"},
        {"name": "type", "type": "string", "description": "Role kind"},
        {"name": "primary", "type": "boolean", "description": "Primary role"}
      ]
    },
    {
      "name": "x509Certificates",
      "type": "complex",
      "description": "X.509 certificates for the user",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "binary", "description": "DER certificate, base64 encoded"},
        {"name": "display", "type": "string", "description": "Display value"},
        {"name": "type", "type": "string", "description": "Certificate kind"},
        {"name": "primary", "type": "boolean", "description": "Primary certificate"}
      ]
    }
  ]
}"#
}

/// The Enterprise User extension schema (RFC 7643 §4.3).
pub fn enterprise_user_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User",
  "name": "EnterpriseUser",
  "description": "Enterprise User",
  "attributes": [
    {
      "name": "employeeNumber",
      "type": "string",
      "description": "Identifier assigned by the organization"
    },
    {
      "name": "costCenter",
      "type": "string",
      "description": "Name of a cost center"
    },
    {
      "name": "organization",
      "type": "string",
      "description": "Name of an organization"
    },
    {
      "name": "division",
      "type": "string",
      "description": "Name of a division"
    },
    {
      "name": "department",
      "type": "string",
      "description": "Name of a department"
    },
    {
      "name": "manager",
      "type": "complex",
      "description": "The user's manager",
      "subAttributes": [
        {"name": "value", "type": "string", "description": "Id of the manager"},
        {"name": "$ref", "type": "reference", "description": "URI of the manager resource",
         "referenceTypes": ["User"]},
        {"name": "displayName", "type": "string", "description": "Manager display name",
         "mutability": "readOnly"}
      ]
    }
  ]
}"#
}

/// The core Group schema (RFC 7643 §4.2).
pub fn group_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Group",
  "name": "Group",
  "description": "Group",
  "attributes": [
    {
      "name": "displayName",
      "type": "string",
      "description": "Human-readable name for the group",
      "required": true
    },
    {
      "name": "members",
      "type": "complex",
      "description": "Members of the group",
      "multiValued": true,
      "subAttributes": [
        {"name": "value", "type": "string", "description": "Id of the member",
         "mutability": "immutable"},
        {"name": "$ref", "type": "reference", "description": "URI of the member resource",
         "referenceTypes": ["User", "Group"], "mutability": "immutable"},
        {"name": "display", "type": "string", "description": "Display value",
         "mutability": "immutable"},
        {"name": "type", "type": "string", "description": "Member kind",
         "canonicalValues": ["User", "Group"], "mutability": "immutable"}
      ]
    }
  ]
}"#
}

/// The meta-schema describing schema documents themselves (RFC 7643 §7).
pub fn schema_meta_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:Schema",
  "name": "Schema",
  "description": "Specifies the schema that describes a SCIM schema",
  "attributes": [
    {
      "name": "id",
      "type": "string",
      "description": "Unique URI of the schema",
      "required": true,
      "caseExact": true,
      "mutability": "readOnly"
    },
    {
      "name": "name",
      "type": "string",
      "description": "Schema name",
      "required": true,
      "mutability": "readOnly"
    },
    {
      "name": "description",
      "type": "string",
      "description": "Schema description",
      "mutability": "readOnly"
    },
    {
      "name": "attributes",
      "type": "complex",
      "description": "Complex attribute defining service provider attributes",
      "multiValued": true,
      "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "name", "type": "string", "description": "Attribute name",
         "required": true, "caseExact": true, "mutability": "readOnly"},
        {"name": "type", "type": "string", "description": "Attribute data type",
         "required": true,
         "canonicalValues": ["string", "boolean", "decimal", "integer", "dateTime",
                             "reference", "binary", "complex"],
         "mutability": "readOnly"},
        {"name": "description", "type": "string", "description": "Attribute description",
         "required": true, "mutability": "readOnly"},
        {"name": "multiValued", "type": "boolean", "description": "Plurality",
         "mutability": "readOnly"},
        {"name": "required", "type": "boolean", "description": "Whether required",
         "mutability": "readOnly"},
        {"name": "canonicalValues", "type": "string", "description": "Suggested canonical values",
         "multiValued": true, "mutability": "readOnly"},
        {"name": "caseExact", "type": "boolean", "description": "Case sensitivity",
         "mutability": "readOnly"},
        {"name": "mutability", "type": "string", "description": "Mutability keyword",
         "canonicalValues": ["readOnly", "readWrite", "immutable", "writeOnly"],
         "caseExact": true, "mutability": "readOnly"},
        {"name": "returned", "type": "string", "description": "Return policy keyword",
         "canonicalValues": ["always", "never", "default", "request"],
         "caseExact": true, "mutability": "readOnly"},
        {"name": "uniqueness", "type": "string", "description": "Uniqueness keyword",
         "canonicalValues": ["none", "server", "global"],
         "caseExact": true, "mutability": "readOnly"},
        {"name": "referenceTypes", "type": "string", "description": "Referenceable resource types",
         "multiValued": true, "mutability": "readOnly"},
        {"name": "subAttributes", "type": "complex", "description": "Sub-attribute definitions",
         "multiValued": true, "mutability": "readOnly",
         "subAttributes": [
           {"name": "name", "type": "string", "description": "Attribute name",
            "required": true, "caseExact": true, "mutability": "readOnly"},
           {"name": "type", "type": "string", "description": "Attribute data type",
            "required": true, "mutability": "readOnly"},
           {"name": "description", "type": "string", "description": "Attribute description",
            "required": true, "mutability": "readOnly"},
           {"name": "multiValued", "type": "boolean", "description": "Plurality",
            "mutability": "readOnly"},
           {"name": "required", "type": "boolean", "description": "Whether required",
            "mutability": "readOnly"},
           {"name": "canonicalValues", "type": "string", "description": "Suggested canonical values",
            "multiValued": true, "mutability": "readOnly"},
           {"name": "caseExact", "type": "boolean", "description": "Case sensitivity",
            "mutability": "readOnly"},
           {"name": "mutability", "type": "string", "description": "Mutability keyword",
            "caseExact": true, "mutability": "readOnly"},
           {"name": "returned", "type": "string", "description": "Return policy keyword",
            "caseExact": true, "mutability": "readOnly"},
           {"name": "uniqueness", "type": "string", "description": "Uniqueness keyword",
            "caseExact": true, "mutability": "readOnly"},
           {"name": "referenceTypes", "type": "string", "description": "Referenceable resource types",
            "multiValued": true, "mutability": "readOnly"}
         ]}
      ]
    }
  ]
}"#
}

/// The meta-schema describing resource type documents (RFC 7643 §6).
pub fn resource_type_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:ResourceType",
  "name": "ResourceType",
  "description": "Specifies the schema that describes a resource type",
  "attributes": [
    {
      "name": "id",
      "type": "string",
      "description": "Resource type id, commonly the same as name",
      "caseExact": true,
      "mutability": "readOnly"
    },
    {
      "name": "name",
      "type": "string",
      "description": "Resource type name, used in the meta.resourceType attribute",
      "required": true,
      "mutability": "readOnly"
    },
    {
      "name": "description",
      "type": "string",
      "description": "Resource type description",
      "mutability": "readOnly"
    },
    {
      "name": "endpoint",
      "type": "reference",
      "description": "HTTP-addressable endpoint relative to the base URL",
      "required": true,
      "referenceTypes": ["uri"],
      "mutability": "readOnly"
    },
    {
      "name": "schema",
      "type": "reference",
      "description": "Primary schema URI of the resource type",
      "required": true,
      "caseExact": true,
      "referenceTypes": ["uri"],
      "mutability": "readOnly"
    },
    {
      "name": "schemaExtensions",
      "type": "complex",
      "description": "Schema extensions of the resource type",
      "multiValued": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "schema", "type": "reference", "description": "Extension schema URI",
         "required": true, "caseExact": true, "referenceTypes": ["uri"],
         "mutability": "readOnly"},
        {"name": "required", "type": "boolean", "description": "Whether the extension is required",
         "required": true, "mutability": "readOnly"}
      ]
    }
  ]
}"#
}

/// The meta-schema describing the service provider configuration (RFC 7643 §5).
pub fn service_provider_config_schema() -> &'static str {
    r#"{
  "id": "urn:ietf:params:scim:schemas:core:2.0:ServiceProviderConfig",
  "name": "ServiceProviderConfig",
  "description": "Schema for representing the service provider's configuration",
  "attributes": [
    {
      "name": "documentationUri",
      "type": "reference",
      "description": "URI of the service provider's documentation",
      "referenceTypes": ["external"],
      "mutability": "readOnly"
    },
    {
      "name": "patch",
      "type": "complex",
      "description": "PATCH configuration options",
      "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "supported", "type": "boolean", "description": "Whether PATCH is supported",
         "required": true, "mutability": "readOnly"}
      ]
    },
    {
      "name": "bulk",
      "type": "complex",
      "description": "Bulk configuration options",
      "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "supported", "type": "boolean", "description": "Whether bulk is supported",
         "required": true, "mutability": "readOnly"},
        {"name": "maxOperations", "type": "integer", "description": "Maximum operations per request",
         "required": true, "mutability": "readOnly"},
        {"name": "maxPayloadSize", "type": "integer", "description": "Maximum payload size in bytes",
         "required": true, "mutability": "readOnly"}
      ]
    },
    {
      "name": "filter",
      "type": "complex",
      "description": "Filter configuration options",
      "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "supported", "type": "boolean", "description": "Whether filtering is supported",
         "required": true, "mutability": "readOnly"},
        {"name": "maxResults", "type": "integer", "description": "Maximum resources per page",
         "required": true, "mutability": "readOnly"}
      ]
    },
    {
      "name": "changePassword",
      "type": "complex",
      "description": "Password change configuration options",
      "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "supported", "type": "boolean", "description": "Whether password change is supported",
         "required": true, "mutability": "readOnly"}
      ]
    },
    {
      "name": "sort",
      "type": "complex",
      "description": "Sort configuration options",
      "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "supported", "type": "boolean", "description": "Whether sorting is supported",
         "required": true, "mutability": "readOnly"}
      ]
    },
    {
      "name": "etag",
      "type": "complex",
      "description": "ETag configuration options",
      "required": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "supported", "type": "boolean", "description": "Whether ETags are supported",
         "required": true, "mutability": "readOnly"}
      ]
    },
    {
      "name": "authenticationSchemes",
      "type": "complex",
      "description": "Supported authentication schemes",
      "multiValued": true,
      "mutability": "readOnly",
      "subAttributes": [
        {"name": "name", "type": "string", "description": "Scheme name",
         "required": true, "mutability": "readOnly"},
        {"name": "description", "type": "string", "description": "Scheme description",
         "required": true, "mutability": "readOnly"},
        {"name": "specUri", "type": "reference", "description": "Specification URI",
         "referenceTypes": ["external"], "mutability": "readOnly"},
        {"name": "type", "type": "string", "description": "Scheme kind",
         "canonicalValues": ["oauth", "oauth2", "oauthbearertoken", "httpbasic", "httpdigest"],
         "mutability": "readOnly"}
      ]
    }
  ]
}"#
}
