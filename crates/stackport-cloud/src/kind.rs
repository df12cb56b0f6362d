//! Resource kinds
//!
//! Each kind knows how to turn user parameters into a [`Program`], how to
//! project stack outputs into a [`Summary`], and which output marks a stack as
//! belonging to it. The orchestrator and the reconciler are written once
//! against [`ResourceKind`].

use crate::engine::StackOutputs;
use crate::error::{Result, StackError};
use crate::program::{Program, Resource, literal, reference};
use crate::summary::{ConsoleLinks, Summary};
use serde::Serialize;
use serde_json::json;

/// Output holding the owner id, exported by every program built with an owner
pub const OWNER_OUTPUT: &str = "owner";

/// Instance types offered when nothing else is configured
pub const DEFAULT_INSTANCE_TYPES: &[&str] = &["t2.micro"];

/// Capability shared by sites and virtual machines
pub trait ResourceKind: Send + Sync {
    /// User input needed to build the program
    type Params: Send + Sync;

    /// Last-applied parameters recovered from outputs
    type Details: Serialize + Send;

    /// Listing cache key (e.g., "sites")
    fn key(&self) -> &'static str;

    /// Human-readable name used in messages (e.g., "Site")
    fn label(&self) -> &'static str;

    /// Output whose presence identifies a stack of this kind
    fn discriminator_key(&self) -> &'static str;

    /// Validate the parameters and build the program to apply
    fn build_program(&self, params: &Self::Params) -> Result<Program>;

    /// Derive the listing entry from a stack's outputs
    fn to_summary(&self, name: &str, outputs: &StackOutputs, links: &ConsoleLinks)
    -> Result<Summary>;

    fn details(&self, outputs: &StackOutputs) -> Self::Details;

    /// Whether a listed stack belongs to this kind
    fn matches(&self, outputs: &StackOutputs) -> bool {
        outputs.contains(self.discriminator_key())
    }
}

// ========== Static websites ==========

/// Static website served from an object storage bucket
#[derive(Debug, Clone, Copy, Default)]
pub struct SiteKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteParams {
    /// HTML served as `index.html`
    pub content: String,
}

impl SiteParams {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteDetails {
    pub content: Option<String>,
    pub website_url: Option<String>,
}

impl SiteKind {
    pub const URL_OUTPUT: &'static str = "website_url";
    pub const CONTENT_OUTPUT: &'static str = "website_content";
}

impl ResourceKind for SiteKind {
    type Params = SiteParams;
    type Details = SiteDetails;

    fn key(&self) -> &'static str {
        "sites"
    }

    fn label(&self) -> &'static str {
        "Site"
    }

    fn discriminator_key(&self) -> &'static str {
        Self::URL_OUTPUT
    }

    fn build_program(&self, params: &SiteParams) -> Result<Program> {
        let content = literal(&params.content);
        let bucket_id = reference("site-bucket", "id");

        let program = Program::new("Static website on S3")
            .with_resource(
                "site-bucket",
                Resource::new(
                    "aws:s3:Bucket",
                    json!({ "website": { "indexDocument": "index.html" } }),
                ),
            )
            .with_resource(
                "index",
                Resource::new(
                    "aws:s3:BucketObject",
                    json!({
                        "bucket": bucket_id,
                        "content": content,
                        "key": "index.html",
                        "contentType": "text/html; charset=utf-8",
                    }),
                ),
            )
            .with_resource(
                "bucket-policy",
                Resource::new(
                    "aws:s3:BucketPolicy",
                    json!({
                        "bucket": bucket_id,
                        "policy": {
                            "fn::toJSON": {
                                "Version": "2012-10-17",
                                "Statement": [{
                                    "Effect": "Allow",
                                    "Principal": "*",
                                    "Action": ["s3:GetObject"],
                                    "Resource": [format!("arn:aws:s3:::{bucket_id}/*")],
                                }],
                            },
                        },
                    }),
                ),
            )
            .with_output(
                Self::URL_OUTPUT,
                json!(reference("site-bucket", "websiteEndpoint")),
            )
            .with_output(Self::CONTENT_OUTPUT, json!(content));

        Ok(program)
    }

    fn to_summary(
        &self,
        name: &str,
        outputs: &StackOutputs,
        links: &ConsoleLinks,
    ) -> Result<Summary> {
        let endpoint = outputs.require(name, Self::URL_OUTPUT)?;
        Ok(
            Summary::site(name, format!("http://{endpoint}"), links.stack_url(name))
                .with_owner(outputs.get(OWNER_OUTPUT).map(str::to_string)),
        )
    }

    fn details(&self, outputs: &StackOutputs) -> SiteDetails {
        SiteDetails {
            content: outputs.get(Self::CONTENT_OUTPUT).map(str::to_string),
            website_url: outputs.get(Self::URL_OUTPUT).map(str::to_string),
        }
    }
}

// ========== Virtual machines ==========

/// Compute instance reachable over SSH
#[derive(Debug, Clone)]
pub struct VmKind {
    instance_types: Vec<String>,
}

impl Default for VmKind {
    fn default() -> Self {
        Self::new(DEFAULT_INSTANCE_TYPES.iter().map(|t| t.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmParams {
    /// OpenSSH public key installed on the instance
    pub public_key: String,
    pub instance_type: String,
}

impl VmParams {
    pub fn new(public_key: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            instance_type: instance_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmDetails {
    pub public_key: Option<String>,
    pub instance_type: Option<String>,
    pub public_ip: Option<String>,
    pub public_dns: Option<String>,
}

impl VmKind {
    pub const INSTANCE_TYPE_OUTPUT: &'static str = "instance_type";
    pub const PUBLIC_KEY_OUTPUT: &'static str = "public_key";
    pub const PUBLIC_IP_OUTPUT: &'static str = "public_ip";
    pub const PUBLIC_DNS_OUTPUT: &'static str = "public_dns";

    pub fn new(instance_types: impl IntoIterator<Item = String>) -> Self {
        Self {
            instance_types: instance_types.into_iter().collect(),
        }
    }

    pub fn instance_types(&self) -> &[String] {
        &self.instance_types
    }

    fn validate(&self, params: &VmParams) -> Result<()> {
        if params.public_key.trim().is_empty() {
            return Err(StackError::MissingKeyMaterial);
        }
        if !self.instance_types.contains(&params.instance_type) {
            return Err(StackError::InvalidInstanceType {
                requested: params.instance_type.clone(),
                allowed: self.instance_types.clone(),
            });
        }
        Ok(())
    }
}

impl ResourceKind for VmKind {
    type Params = VmParams;
    type Details = VmDetails;

    fn key(&self) -> &'static str {
        "vms"
    }

    fn label(&self) -> &'static str {
        "VM"
    }

    fn discriminator_key(&self) -> &'static str {
        Self::PUBLIC_DNS_OUTPUT
    }

    fn build_program(&self, params: &VmParams) -> Result<Program> {
        self.validate(params)?;

        let public_key = literal(params.public_key.trim());

        let program = Program::new("Virtual machine on EC2")
            .with_variable(
                "ami",
                json!({
                    "fn::invoke": {
                        "function": "aws:ec2:getAmi",
                        "arguments": {
                            "mostRecent": true,
                            "owners": ["amazon"],
                            "filters": [{ "name": "name", "values": ["amzn2-ami-minimal-hvm-*"] }],
                        },
                        "return": "id",
                    }
                }),
            )
            .with_resource(
                "ssh-secgrp",
                Resource::new(
                    "aws:ec2:SecurityGroup",
                    json!({
                        "description": "Allow inbound SSH",
                        "ingress": [{
                            "protocol": "tcp",
                            "fromPort": 22,
                            "toPort": 22,
                            "cidrBlocks": ["0.0.0.0/0"],
                        }],
                        "egress": [{
                            "protocol": "-1",
                            "fromPort": 0,
                            "toPort": 0,
                            "cidrBlocks": ["0.0.0.0/0"],
                        }],
                    }),
                ),
            )
            .with_resource(
                "keypair",
                Resource::new("aws:ec2:KeyPair", json!({ "publicKey": public_key })),
            )
            .with_resource(
                "server",
                Resource::new(
                    "aws:ec2:Instance",
                    json!({
                        "ami": "${ami}",
                        "instanceType": params.instance_type,
                        "keyName": reference("keypair", "keyName"),
                        "vpcSecurityGroupIds": [reference("ssh-secgrp", "id")],
                    }),
                ),
            )
            .with_output(Self::INSTANCE_TYPE_OUTPUT, json!(params.instance_type))
            .with_output(Self::PUBLIC_KEY_OUTPUT, json!(public_key))
            .with_output(Self::PUBLIC_IP_OUTPUT, json!(reference("server", "publicIp")))
            .with_output(
                Self::PUBLIC_DNS_OUTPUT,
                json!(reference("server", "publicDns")),
            );

        Ok(program)
    }

    fn to_summary(
        &self,
        name: &str,
        outputs: &StackOutputs,
        links: &ConsoleLinks,
    ) -> Result<Summary> {
        let dns_name = outputs.require(name, Self::PUBLIC_DNS_OUTPUT)?;
        Ok(Summary::vm(name, dns_name, links.stack_url(name))
            .with_owner(outputs.get(OWNER_OUTPUT).map(str::to_string)))
    }

    fn details(&self, outputs: &StackOutputs) -> VmDetails {
        VmDetails {
            public_key: outputs.get(Self::PUBLIC_KEY_OUTPUT).map(str::to_string),
            instance_type: outputs.get(Self::INSTANCE_TYPE_OUTPUT).map(str::to_string),
            public_ip: outputs.get(Self::PUBLIC_IP_OUTPUT).map(str::to_string),
            public_dns: outputs.get(Self::PUBLIC_DNS_OUTPUT).map(str::to_string),
        }
    }
}
